/*
[INPUT]:  Signed challenge produced by the signer adapter
[OUTPUT]: Serializable verification request body
[POS]:    Data layer - request payloads for register/update endpoints
[UPDATE]: When the verification payload shape changes
*/

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/auth/register` and `POST /v1/user/update`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRequest {
    /// Base58 wallet public key being claimed
    #[serde(rename = "pubKey")]
    pub pub_key: String,
    /// Standard base64 ed25519 signature over `message`
    pub signature: String,
    /// Exact challenge text that was signed
    pub message: String,
}
