/*
[INPUT]:  Error sources (wallet, HTTP, verifier, serialization, storage)
[OUTPUT]: Structured error types with failure kinds and retry hints
[POS]:    Error handling layer - unified error types for entire crate
[UPDATE]: When adding new error sources or server rejection codes
*/

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::StateError;

/// Suspension point a timeout was hit at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStage {
    WalletConnect,
    Signature,
    ServerVerification,
}

impl fmt::Display for FlowStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlowStage::WalletConnect => "wallet connect",
            FlowStage::Signature => "signature approval",
            FlowStage::ServerVerification => "server verification",
        };
        f.write_str(label)
    }
}

/// Main error type for wallet-linked authentication
#[derive(Error, Debug)]
pub enum AuthError {
    /// No wallet is connected, or the wallet cannot sign
    #[error("No wallet connected")]
    NoWalletConnected,

    /// The user declined the signature prompt
    #[error("User rejected the signature request")]
    UserRejectedSignature,

    /// The wallet failed to produce a signature
    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    /// Transport-level failure talking to the identity server
    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    /// Signature does not verify against the claimed public key
    #[error("Invalid wallet signature")]
    InvalidSignature,

    /// Submitted message differs from the recomputed challenge
    #[error("Signed message does not match the expected challenge")]
    MessageMismatch,

    /// Public key is not a base58-encoded ed25519 key
    #[error("Unknown public key format: {0}")]
    UnknownPublicKeyFormat(String),

    /// Operation needs an authenticated session
    #[error("An authenticated session is required")]
    SessionRequired,

    /// Wallet is already bound to a different identity
    #[error("Wallet {address} is already linked to another account")]
    WalletAlreadyLinked { address: String },

    /// Origin is not a canonical scheme://host[:port]
    #[error("Invalid origin: {0}")]
    InvalidOrigin(String),

    /// A suspension point did not resolve in time
    #[error("Timed out waiting for {stage} after {duration}s")]
    Timeout { stage: FlowStage, duration: u64 },

    /// A newer attempt replaced this one before it resolved
    #[error("Authentication attempt superseded by a newer one")]
    Superseded,

    /// Server returned an error response without a known rejection code
    #[error("API error (code {code}): {message}")]
    Api { code: i32, message: String },

    /// Invalid response from server
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Key or session storage failed
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Flow event arrived in a state that does not accept it
    #[error(transparent)]
    State(#[from] StateError),
}

/// Copyable projection of [`AuthError`] carried by the negotiator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NoWalletConnected,
    UserRejectedSignature,
    SignerUnavailable,
    NetworkFailure,
    InvalidSignature,
    MessageMismatch,
    UnknownPublicKeyFormat,
    SessionRequired,
    WalletAlreadyLinked,
    InvalidOrigin,
    Timeout,
    Superseded,
    Server,
    Internal,
}

impl AuthError {
    /// Failure kind for state reporting
    pub fn kind(&self) -> FailureKind {
        match self {
            AuthError::NoWalletConnected => FailureKind::NoWalletConnected,
            AuthError::UserRejectedSignature => FailureKind::UserRejectedSignature,
            AuthError::SignerUnavailable(_) => FailureKind::SignerUnavailable,
            AuthError::NetworkFailure(_) => FailureKind::NetworkFailure,
            AuthError::InvalidSignature => FailureKind::InvalidSignature,
            AuthError::MessageMismatch => FailureKind::MessageMismatch,
            AuthError::UnknownPublicKeyFormat(_) => FailureKind::UnknownPublicKeyFormat,
            AuthError::SessionRequired => FailureKind::SessionRequired,
            AuthError::WalletAlreadyLinked { .. } => FailureKind::WalletAlreadyLinked,
            AuthError::InvalidOrigin(_) => FailureKind::InvalidOrigin,
            AuthError::Timeout { .. } => FailureKind::Timeout,
            AuthError::Superseded => FailureKind::Superseded,
            AuthError::Api { .. } | AuthError::InvalidResponse(_) => FailureKind::Server,
            AuthError::Serialization(_)
            | AuthError::UrlParse(_)
            | AuthError::Config(_)
            | AuthError::Storage(_)
            | AuthError::State(_) => FailureKind::Internal,
        }
    }

    /// Check if the error is retryable
    ///
    /// Every failure of the flow can be retried by the user; this marks the
    /// ones where an immediate automatic retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::NetworkFailure(_)
                | AuthError::Timeout { .. }
                | AuthError::SignerUnavailable(_)
                | AuthError::InvalidResponse(_)
        )
    }

    /// Wallet-side failures are resolved locally without touching the server
    pub fn is_wallet_error(&self) -> bool {
        matches!(
            self,
            AuthError::NoWalletConnected
                | AuthError::UserRejectedSignature
                | AuthError::SignerUnavailable(_)
        )
    }

    /// Server refused the credentials
    pub fn is_verification_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidSignature
                | AuthError::MessageMismatch
                | AuthError::UnknownPublicKeyFormat(_)
                | AuthError::SessionRequired
                | AuthError::WalletAlreadyLinked { .. }
        )
    }

    /// Short user-facing notice for a transient toast
    pub fn notice(&self) -> &'static str {
        match self.kind() {
            FailureKind::NoWalletConnected => "no wallet connected",
            FailureKind::UserRejectedSignature
            | FailureKind::SignerUnavailable => "error signing message",
            FailureKind::SessionRequired => "please sign in with GitHub first",
            FailureKind::WalletAlreadyLinked => "wallet already linked to another account",
            FailureKind::Timeout => "request timed out",
            _ => "error verifying wallet",
        }
    }

    /// Create an API error from status code and message
    pub fn api_error(status: StatusCode, message: impl Into<String>) -> Self {
        AuthError::Api {
            code: status.as_u16() as i32,
            message: message.into(),
        }
    }
}

/// Result type alias for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;
