/*
[INPUT]:  Requesting origin and claimed base58 public key
[OUTPUT]: Deterministic challenge message for the wallet to sign
[POS]:    Auth layer - challenge composer shared by client and verifier
[UPDATE]: When the challenge wording or origin rules change
*/

use std::fmt;

use url::Url;

use crate::http::{AuthError, Result};

const CHALLENGE_INFIX: &str = " wants you to sign and verify your account for ";

/// Exact text a wallet is asked to sign
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChallengeMessage(String);

impl ChallengeMessage {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// UTF-8 bytes handed to the wallet
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Public key embedded in the message
    pub fn public_key(&self) -> &str {
        self.0
            .split_once(CHALLENGE_INFIX)
            .map(|(_, key)| key)
            .unwrap_or_default()
    }

    /// Origin embedded in the message
    pub fn origin(&self) -> &str {
        self.0
            .split_once(CHALLENGE_INFIX)
            .map(|(origin, _)| origin)
            .unwrap_or_default()
    }
}

impl fmt::Display for ChallengeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChallengeMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Build the challenge for `public_key` requested from `origin`
///
/// Pure and deterministic: identical inputs always give identical bytes.
pub fn compose(origin: &str, public_key: &str) -> Result<ChallengeMessage> {
    let origin = canonical_origin(origin)?;

    let public_key = public_key.trim();
    if public_key.is_empty() {
        return Err(AuthError::UnknownPublicKeyFormat(
            "public key is empty".to_string(),
        ));
    }
    if public_key.chars().any(char::is_whitespace) {
        return Err(AuthError::UnknownPublicKeyFormat(format!(
            "public key contains whitespace: {public_key:?}"
        )));
    }

    Ok(ChallengeMessage(format!("{origin}{CHALLENGE_INFIX}{public_key}")))
}

/// Normalize an origin to `scheme://host[:port]`
///
/// Inputs carrying a path, query, fragment or credentials are rejected rather
/// than silently truncated.
pub fn canonical_origin(origin: &str) -> Result<String> {
    let trimmed = origin.trim();
    let url = Url::parse(trimmed)
        .map_err(|e| AuthError::InvalidOrigin(format!("{trimmed:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(AuthError::InvalidOrigin(format!(
            "unsupported scheme {:?}",
            url.scheme()
        )));
    }
    if url.host_str().is_none() {
        return Err(AuthError::InvalidOrigin(format!("{trimmed:?} has no host")));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(AuthError::InvalidOrigin(format!(
            "{trimmed:?} must not carry a path, query or fragment"
        )));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(AuthError::InvalidOrigin(format!(
            "{trimmed:?} must not carry credentials"
        )));
    }

    Ok(url.origin().ascii_serialization())
}
