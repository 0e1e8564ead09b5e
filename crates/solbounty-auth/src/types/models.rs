/*
[INPUT]:  Identity projection returned by the identity server
[OUTPUT]: Typed identity profile and response envelope
[POS]:    Data layer - read-only client view of server-owned accounts
[UPDATE]: When the profile payload gains or renames fields
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Client-side projection of an Identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub id: String,
    /// GitHub login handle, absent for wallet-only accounts
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// Bound wallet address (base58), absent until first verification
    #[serde(rename = "account_addr", default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl IdentityProfile {
    /// Name to show for the account, falling back to login then wallet
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.login.as_deref())
            .or(self.wallet_address.as_deref())
            .unwrap_or(&self.id)
    }

    pub fn has_wallet(&self) -> bool {
        self.wallet_address.is_some()
    }
}

/// `{"data": ...}` wrapper used by every identity endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub data: T,
}
