/*
[INPUT]:  Error bodies returned by the identity server
[OUTPUT]: Rejection codes mapped onto AuthError
[POS]:    Data layer - server error payloads
[UPDATE]: When the server adds rejection codes
*/

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::http::AuthError;

/// Machine-readable reason a verification was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionCode {
    InvalidSignature,
    MessageMismatch,
    UnknownPublicKeyFormat,
    SessionRequired,
    WalletAlreadyLinked,
}

/// Error body: `{"error": "<code>", "message": "..."}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn rejection(code: RejectionCode, message: impl Into<String>) -> Self {
        let error = serde_json::to_value(code)
            .ok()
            .and_then(|value| value.as_str().map(str::to_string));
        Self {
            error,
            message: Some(message.into()),
        }
    }

    pub fn code(&self) -> Option<RejectionCode> {
        let raw = self.error.as_deref()?;
        serde_json::from_value(serde_json::Value::String(raw.to_string())).ok()
    }

    /// Translate a non-2xx response into the crate error taxonomy
    pub fn into_error(self, status: StatusCode, wallet_hint: Option<&str>) -> AuthError {
        let detail = self.message.clone().unwrap_or_default();
        match self.code() {
            Some(RejectionCode::InvalidSignature) => AuthError::InvalidSignature,
            Some(RejectionCode::MessageMismatch) => AuthError::MessageMismatch,
            Some(RejectionCode::UnknownPublicKeyFormat) => {
                AuthError::UnknownPublicKeyFormat(detail)
            }
            Some(RejectionCode::SessionRequired) => AuthError::SessionRequired,
            Some(RejectionCode::WalletAlreadyLinked) => AuthError::WalletAlreadyLinked {
                address: wallet_hint.unwrap_or_default().to_string(),
            },
            None if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
                AuthError::SessionRequired
            }
            None => {
                let message = self
                    .message
                    .or(self.error)
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
                AuthError::api_error(status, message)
            }
        }
    }
}

impl RejectionCode {
    /// Code a server reports for a verifier error, if it is a rejection
    pub fn for_error(err: &AuthError) -> Option<Self> {
        match err {
            AuthError::InvalidSignature => Some(RejectionCode::InvalidSignature),
            AuthError::MessageMismatch => Some(RejectionCode::MessageMismatch),
            AuthError::UnknownPublicKeyFormat(_) => Some(RejectionCode::UnknownPublicKeyFormat),
            AuthError::SessionRequired => Some(RejectionCode::SessionRequired),
            AuthError::WalletAlreadyLinked { .. } => Some(RejectionCode::WalletAlreadyLinked),
            _ => None,
        }
    }

    /// HTTP status a server answers with for this rejection
    pub fn status(self) -> StatusCode {
        match self {
            RejectionCode::InvalidSignature | RejectionCode::SessionRequired => {
                StatusCode::UNAUTHORIZED
            }
            RejectionCode::MessageMismatch | RejectionCode::UnknownPublicKeyFormat => {
                StatusCode::BAD_REQUEST
            }
            RejectionCode::WalletAlreadyLinked => StatusCode::CONFLICT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("invalid_signature", StatusCode::UNAUTHORIZED, "invalid_signature")]
    #[case("message_mismatch", StatusCode::BAD_REQUEST, "message_mismatch")]
    #[case("unknown_public_key_format", StatusCode::BAD_REQUEST, "unknown_public_key_format")]
    #[case("session_required", StatusCode::UNAUTHORIZED, "session_required")]
    #[case("wallet_already_linked", StatusCode::CONFLICT, "wallet_already_linked")]
    fn test_known_codes_map_to_taxonomy(
        #[case] code: &str,
        #[case] status: StatusCode,
        #[case] expected_kind: &str,
    ) {
        let body = ErrorResponse {
            error: Some(code.to_string()),
            message: Some("rejected".to_string()),
        };
        let err = body.into_error(status, Some("Wallet111"));
        let kind = serde_json::to_value(err.kind()).unwrap();
        assert_eq!(kind, serde_json::json!(expected_kind));
    }

    #[test]
    fn test_bare_unauthorized_means_session_required() {
        let err = ErrorResponse::default().into_error(StatusCode::UNAUTHORIZED, None);
        assert!(matches!(err, AuthError::SessionRequired));
    }

    #[test]
    fn test_unknown_code_becomes_api_error() {
        let body = ErrorResponse {
            error: Some("rate_limited".to_string()),
            message: None,
        };
        match body.into_error(StatusCode::TOO_MANY_REQUESTS, None) {
            AuthError::Api { code, message } => {
                assert_eq!(code, 429);
                assert_eq!(message, "rate_limited");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejection_round_trips_through_code() {
        let body = ErrorResponse::rejection(RejectionCode::MessageMismatch, "tampered");
        assert_eq!(body.error.as_deref(), Some("message_mismatch"));
        assert_eq!(body.code(), Some(RejectionCode::MessageMismatch));
    }
}
