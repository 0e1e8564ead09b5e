/*
[INPUT]:  Identity projections from successful verifications
[OUTPUT]: Current session projection and wallet binding
[POS]:    Auth layer - client-side view of the server session
[UPDATE]: When session metadata or rebind rules change
*/

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::types::IdentityProfile;

/// What the client knows about its authenticated session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    pub identity: IdentityProfile,
    pub established_at: DateTime<Utc>,
    pub wallet_updated_at: Option<DateTime<Utc>>,
}

/// Session credential issued by a verification response
///
/// Raw `Set-Cookie` values for the HTTP client, the bare token for the
/// in-process backend. Only installed by the attempt that commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCredential(Vec<String>);

impl SessionCredential {
    /// `None` when the response issued nothing
    pub fn new(values: Vec<String>) -> Option<Self> {
        (!values.is_empty()).then_some(Self(values))
    }

    pub fn token(token: impl Into<String>) -> Self {
        Self(vec![token.into()])
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }
}

/// Thread-safe session projection
///
/// The credential itself lives in the HTTP cookie store; this only mirrors
/// the identity the server reported for it.
#[derive(Debug, Clone, Default)]
pub struct SessionTracker {
    data: Arc<RwLock<Option<SessionData>>>,
}

impl SessionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly established session
    pub fn establish(&self, identity: IdentityProfile) {
        let session = SessionData {
            identity,
            established_at: Utc::now(),
            wallet_updated_at: None,
        };
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(session);
    }

    /// Apply a wallet rebind to the current identity
    ///
    /// A full profile from the server replaces the cached one; otherwise only
    /// the wallet address is patched. Without a session this is a no-op.
    pub fn rebind_wallet(&self, wallet_address: &str, identity: Option<IdentityProfile>) {
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = guard.as_mut() {
            match identity {
                Some(identity) => session.identity = identity,
                None => session.identity.wallet_address = Some(wallet_address.to_string()),
            }
            session.wallet_updated_at = Some(Utc::now());
        }
    }

    pub fn identity(&self) -> Option<IdentityProfile> {
        let guard = self.data.read().unwrap_or_else(|e| e.into_inner());
        guard.as_ref().map(|data| data.identity.clone())
    }

    pub fn session(&self) -> Option<SessionData> {
        let guard = self.data.read().unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        let guard = self.data.read().unwrap_or_else(|e| e.into_inner());
        guard.is_some()
    }

    /// Forget the session (logout)
    pub fn clear(&self) {
        let mut guard = self.data.write().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }
}
