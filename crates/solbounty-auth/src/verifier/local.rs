/*
[INPUT]:  Reference verifier, client origin and an optional session token
[OUTPUT]: In-process IdentityBackend for tests and offline simulation
[POS]:    Verifier layer - loopback transport without HTTP
[UPDATE]: When IdentityBackend gains new operations
*/

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::auth::{BackendReply, IdentityBackend, SessionCredential, canonical_origin};
use crate::http::Result;
use crate::types::{IdentityProfile, VerificationRequest};
use crate::verifier::service::ReferenceVerifier;

/// Calls the verifier directly, holding the session token a cookie jar would
///
/// Issued tokens are returned in the reply and kept only once stored.
#[derive(Debug)]
pub struct LocalBackend {
    verifier: Arc<ReferenceVerifier>,
    origin: String,
    session_token: RwLock<Option<String>>,
}

impl LocalBackend {
    /// `origin` is what the server would read from the request headers
    pub fn new(verifier: Arc<ReferenceVerifier>, origin: &str) -> Result<Self> {
        Ok(Self {
            verifier,
            origin: canonical_origin(origin)?,
            session_token: RwLock::new(None),
        })
    }

    /// Start with an existing session, e.g. after a GitHub login
    pub fn with_session(self, token: impl Into<String>) -> Self {
        *self.session_token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.into());
        self
    }

    pub fn session_token(&self) -> Option<String> {
        self.session_token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn verifier(&self) -> &Arc<ReferenceVerifier> {
        &self.verifier
    }
}

#[async_trait]
impl IdentityBackend for LocalBackend {
    fn has_session(&self) -> bool {
        self.session_token().is_some()
    }

    async fn register(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<IdentityProfile>> {
        let token = self.session_token();
        let login = self
            .verifier
            .register(&self.origin, token.as_deref(), request)?;

        Ok(BackendReply::new(
            login.identity,
            Some(SessionCredential::token(login.session.token)),
        ))
    }

    async fn update_wallet(
        &self,
        request: &VerificationRequest,
    ) -> Result<BackendReply<Option<IdentityProfile>>> {
        let token = self.session_token();
        let identity = self
            .verifier
            .update_wallet(&self.origin, token.as_deref(), request)?;
        Ok(BackendReply::new(Some(identity), None))
    }

    fn store_session(&self, credential: &SessionCredential) {
        if let Some(token) = credential.values().last() {
            *self
                .session_token
                .write()
                .unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{KeypairWallet, SignerAdapter, compose};
    use crate::verifier::IdentityRegistry;

    #[tokio::test]
    async fn test_register_returns_issued_session() {
        let verifier = Arc::new(ReferenceVerifier::new(Arc::new(IdentityRegistry::default())));
        let backend = LocalBackend::new(verifier.clone(), "https://app.example").unwrap();
        assert!(!backend.has_session());

        let wallet = KeypairWallet::generate().connected();
        let message = compose("https://app.example", wallet.address()).unwrap();
        let request: VerificationRequest = SignerAdapter::default()
            .request_signature(&wallet, message)
            .await
            .unwrap()
            .into();

        let reply = backend.register(&request).await.unwrap();
        assert!(!backend.has_session());

        backend.store_session(&reply.credential.unwrap());
        let token = backend.session_token().unwrap();
        assert_eq!(
            verifier.registry().session_identity(&token).unwrap().id.to_string(),
            reply.data.id
        );
    }
}
