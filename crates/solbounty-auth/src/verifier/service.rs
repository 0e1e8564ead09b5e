/*
[INPUT]:  Verification requests, request origin and session tokens
[OUTPUT]: Verified logins with sessions, or wallet rebinds
[POS]:    Verifier layer - server-side verification rules
[UPDATE]: When verification order or binding semantics change
*/

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::auth::compose;
use crate::http::{AuthError, Result};
use crate::types::{IdentityProfile, VerificationRequest};
use crate::verifier::registry::{IdentityRegistry, Resolution, SessionGrant};
use crate::verifier::signature::{decode_public_key, verify_wallet_signature};

/// Successful register/login
#[derive(Debug, Clone)]
pub struct VerifiedLogin {
    pub identity: IdentityProfile,
    pub session: SessionGrant,
    pub resolution: Resolution,
}

/// Reference implementation of the server-side verifier
///
/// Nothing is written to the registry unless every check passes.
#[derive(Debug, Clone)]
pub struct ReferenceVerifier {
    registry: Arc<IdentityRegistry>,
}

impl ReferenceVerifier {
    pub fn new(registry: Arc<IdentityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<IdentityRegistry> {
        &self.registry
    }

    /// Check a triple against the challenge recomputed for `origin`
    pub fn verify(&self, origin: &str, request: &VerificationRequest) -> Result<()> {
        decode_public_key(&request.pub_key)?;

        let expected = compose(origin, &request.pub_key)?;
        if expected.as_str() != request.message {
            debug!(
                expected = %expected,
                received = %request.message,
                "challenge mismatch"
            );
            return Err(AuthError::MessageMismatch);
        }

        verify_wallet_signature(&request.pub_key, &request.signature, expected.as_bytes())
    }

    /// `POST /v1/auth/register`
    pub fn register(
        &self,
        origin: &str,
        session_token: Option<&str>,
        request: &VerificationRequest,
    ) -> Result<VerifiedLogin> {
        if let Err(err) = self.verify(origin, request) {
            warn!(pub_key = %request.pub_key, kind = ?err.kind(), "register rejected");
            return Err(err);
        }

        let session_identity = session_token
            .and_then(|token| self.registry.session_identity(token))
            .map(|identity| identity.id);
        let (identity, resolution) = self
            .registry
            .resolve_for_login(&request.pub_key, session_identity)?;
        let session = self.registry.issue_session(identity.id)?;

        info!(
            identity = %identity.id,
            pub_key = %request.pub_key,
            ?resolution,
            "wallet login verified"
        );
        Ok(VerifiedLogin {
            identity: identity.profile(),
            session,
            resolution,
        })
    }

    /// `POST /v1/user/update`
    ///
    /// The session is checked before any cryptography, so a captured triple
    /// is useless here without the victim's session.
    pub fn update_wallet(
        &self,
        origin: &str,
        session_token: Option<&str>,
        request: &VerificationRequest,
    ) -> Result<IdentityProfile> {
        let identity = session_token
            .and_then(|token| self.registry.session_identity(token))
            .ok_or(AuthError::SessionRequired)?;

        if let Err(err) = self.verify(origin, request) {
            warn!(identity = %identity.id, kind = ?err.kind(), "wallet update rejected");
            return Err(err);
        }

        let updated = self.registry.rebind_wallet(identity.id, &request.pub_key)?;
        info!(
            identity = %updated.id,
            previous = ?identity.wallet_address,
            pub_key = %request.pub_key,
            "wallet rebound"
        );
        Ok(updated.profile())
    }
}
