/*
[INPUT]:  GitHub logins, verified wallet addresses and session tokens
[OUTPUT]: Durable identities, wallet bindings and session grants
[POS]:    Verifier layer - in-memory account store for the reference verifier
[UPDATE]: When identity attributes or binding rules change
*/

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::http::{AuthError, Result};
use crate::types::IdentityProfile;

const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// Server-side account record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: Uuid,
    pub login: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub wallet_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            login: None,
            name: None,
            avatar_url: None,
            wallet_address: None,
            created_at: Utc::now(),
        }
    }

    /// Read-only projection handed to clients
    pub fn profile(&self) -> IdentityProfile {
        IdentityProfile {
            id: self.id.to_string(),
            login: self.login.clone(),
            name: self.name.clone(),
            avatar_url: self.avatar_url.clone(),
            wallet_address: self.wallet_address.clone(),
            created_at: Some(self.created_at),
        }
    }
}

/// Issued session credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub token: String,
    pub identity_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl SessionGrant {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// `Set-Cookie` style value for HTTP transports
    pub fn cookie(&self) -> String {
        format!("session={}; Path=/; HttpOnly", self.token)
    }
}

/// How a registration found its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Wallet was already bound to this identity
    Existing,
    /// Wallet bound to the caller's wallet-less session identity
    LinkedToSession,
    /// New identity created for the wallet
    Created,
}

#[derive(Debug, Default)]
struct RegistryInner {
    identities: HashMap<Uuid, Identity>,
    by_wallet: HashMap<String, Uuid>,
    by_login: HashMap<String, Uuid>,
    sessions: HashMap<String, SessionGrant>,
}

impl RegistryInner {
    fn get(&self, id: Uuid) -> Result<&Identity> {
        self.identities
            .get(&id)
            .ok_or_else(|| AuthError::Config(format!("identity {id} vanished from registry")))
    }

    fn get_mut(&mut self, id: Uuid) -> Result<&mut Identity> {
        self.identities
            .get_mut(&id)
            .ok_or_else(|| AuthError::Config(format!("identity {id} vanished from registry")))
    }
}

/// In-memory identity and session store
#[derive(Debug)]
pub struct IdentityRegistry {
    inner: RwLock<RegistryInner>,
    session_ttl: Duration,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new(Duration::hours(DEFAULT_SESSION_TTL_HOURS))
    }
}

impl IdentityRegistry {
    pub fn new(session_ttl: Duration) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            session_ttl,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a completed GitHub login and open a session for it
    ///
    /// Stands in for the OAuth callback behind `GET /v1/auth/github`.
    pub fn link_github(
        &self,
        login: &str,
        name: Option<&str>,
        avatar_url: Option<&str>,
    ) -> (Identity, SessionGrant) {
        let mut inner = self.write();
        let mut identity = inner
            .by_login
            .get(login)
            .and_then(|id| inner.identities.get(id))
            .cloned()
            .unwrap_or_else(|| {
                let mut identity = Identity::new();
                identity.login = Some(login.to_string());
                identity
            });
        identity.name = name.map(str::to_string);
        identity.avatar_url = avatar_url.map(str::to_string);

        let id = identity.id;
        inner.by_login.insert(login.to_string(), id);
        inner.identities.insert(id, identity.clone());
        let grant = self.grant(&mut inner, id);
        (identity, grant)
    }

    pub fn identity(&self, id: Uuid) -> Option<Identity> {
        self.read().identities.get(&id).cloned()
    }

    pub fn find_by_wallet(&self, wallet_address: &str) -> Option<Identity> {
        let inner = self.read();
        let id = inner.by_wallet.get(wallet_address)?;
        inner.identities.get(id).cloned()
    }

    /// Identity behind a live session token
    pub fn session_identity(&self, token: &str) -> Option<Identity> {
        let inner = self.read();
        let grant = inner.sessions.get(token)?;
        if grant.is_expired() {
            return None;
        }
        inner.identities.get(&grant.identity_id).cloned()
    }

    /// Resolve the identity a verified wallet signs in as
    ///
    /// Order: the identity already bound to the wallet, then the caller's
    /// session identity if it has no wallet yet, then a new identity.
    pub fn resolve_for_login(
        &self,
        wallet_address: &str,
        session_identity: Option<Uuid>,
    ) -> Result<(Identity, Resolution)> {
        let mut inner = self.write();

        if let Some(id) = inner.by_wallet.get(wallet_address).copied() {
            return Ok((inner.get(id)?.clone(), Resolution::Existing));
        }

        if let Some(id) = session_identity {
            let identity = inner.get_mut(id)?;
            if identity.wallet_address.is_none() {
                identity.wallet_address = Some(wallet_address.to_string());
                let identity = identity.clone();
                inner.by_wallet.insert(wallet_address.to_string(), id);
                return Ok((identity, Resolution::LinkedToSession));
            }
        }

        let mut identity = Identity::new();
        identity.wallet_address = Some(wallet_address.to_string());
        inner.by_wallet.insert(wallet_address.to_string(), identity.id);
        inner.identities.insert(identity.id, identity.clone());
        Ok((identity, Resolution::Created))
    }

    /// Move `id`'s wallet binding to `wallet_address`
    pub fn rebind_wallet(&self, id: Uuid, wallet_address: &str) -> Result<Identity> {
        let mut inner = self.write();

        match inner.by_wallet.get(wallet_address) {
            Some(owner) if *owner == id => return Ok(inner.get(id)?.clone()),
            Some(_) => {
                return Err(AuthError::WalletAlreadyLinked {
                    address: wallet_address.to_string(),
                });
            }
            None => {}
        }

        let identity = inner.get_mut(id)?;
        let previous = identity.wallet_address.replace(wallet_address.to_string());
        let identity = identity.clone();

        if let Some(previous) = previous {
            inner.by_wallet.remove(&previous);
        }
        inner.by_wallet.insert(wallet_address.to_string(), id);
        Ok(identity)
    }

    /// Open a new session for `id`
    pub fn issue_session(&self, id: Uuid) -> Result<SessionGrant> {
        let mut inner = self.write();
        inner.get(id)?;
        Ok(self.grant(&mut inner, id))
    }

    fn grant(&self, inner: &mut RegistryInner, id: Uuid) -> SessionGrant {
        inner.sessions.retain(|_, grant| !grant.is_expired());
        let grant = SessionGrant {
            token: Uuid::new_v4().simple().to_string(),
            identity_id: id,
            expires_at: Utc::now() + self.session_ttl,
        };
        inner.sessions.insert(grant.token.clone(), grant.clone());
        grant
    }

    /// Invalidate a session (logout)
    pub fn revoke_session(&self, token: &str) -> bool {
        self.write().sessions.remove(token).is_some()
    }

    pub fn identity_count(&self) -> usize {
        self.read().identities.len()
    }

    pub fn session_count(&self) -> usize {
        self.read().sessions.len()
    }
}
