/*
[INPUT]:  Session cookie and identity from a successful login
[OUTPUT]: JSON session file restored by later commands
[POS]:    Persistence layer - CLI stand-in for the browser cookie jar
[UPDATE]: When the persisted session fields change
*/

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solbounty_auth::{IdentityClient, IdentityProfile};
use tokio::fs;
use tracing::debug;

/// Persisted session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    /// API the cookie belongs to
    pub api_url: String,
    /// `Cookie` header value, e.g. `session=abc123`
    pub cookie: String,
    #[serde(default)]
    pub identity: Option<IdentityProfile>,
    pub saved_at: DateTime<Utc>,
}

impl StoredSession {
    /// Capture the cookie currently held by `client`
    pub fn capture(client: &IdentityClient, identity: Option<IdentityProfile>) -> Option<Self> {
        let cookie = client.session_cookie()?;
        Some(Self {
            api_url: client.base_url().to_string(),
            cookie,
            identity,
            saved_at: Utc::now(),
        })
    }

    /// Seed `client` with the cookie if it was issued by the same API
    pub fn restore_into(&self, client: &IdentityClient) -> bool {
        if self.api_url != client.base_url().as_str() {
            debug!(stored = %self.api_url, current = %client.base_url(), "ignoring session for other API");
            return false;
        }
        for pair in self.cookie.split(';') {
            let pair = pair.trim();
            if !pair.is_empty() {
                client.set_session_cookie(&format!("{pair}; Path=/"));
            }
        }
        true
    }
}

/// Session file manager
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("read session file {}", self.path.display()))?;
        let session = serde_json::from_str(&content).context("parse session file")?;
        Ok(Some(session))
    }

    pub async fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, content)
            .await
            .with_context(|| format!("write session file {}", self.path.display()))?;
        restrict_permissions(&self.path).await?;
        debug!(path = %self.path.display(), "session saved");
        Ok(())
    }

    /// Remove the session file; returns whether one existed
    pub async fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).await?;
        Ok(true)
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
