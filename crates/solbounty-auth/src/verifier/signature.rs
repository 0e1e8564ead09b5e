/*
[INPUT]:  Base58 public key, base64 signature and message bytes
[OUTPUT]: Verified or rejected ed25519 wallet signature
[POS]:    Verifier layer - cryptographic check of wallet ownership
[UPDATE]: When supporting other wallet signature schemes
*/

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use ed25519_dalek::{Signature, VerifyingKey};

use crate::http::{AuthError, Result};

/// Parse a Solana address into an ed25519 verifying key
pub fn decode_public_key(pub_key: &str) -> Result<VerifyingKey> {
    let bytes = bs58::decode(pub_key)
        .into_vec()
        .map_err(|e| AuthError::UnknownPublicKeyFormat(format!("{pub_key:?}: {e}")))?;

    let bytes: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
        AuthError::UnknownPublicKeyFormat(format!("expected 32 bytes, got {}", bytes.len()))
    })?;

    VerifyingKey::from_bytes(&bytes)
        .map_err(|e| AuthError::UnknownPublicKeyFormat(format!("not an ed25519 point: {e}")))
}

/// Parse a standard base64 ed25519 signature
pub fn decode_signature(signature: &str) -> Result<Signature> {
    let bytes = BASE64
        .decode(signature.trim())
        .map_err(|_| AuthError::InvalidSignature)?;
    let bytes: [u8; 64] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| AuthError::InvalidSignature)?;
    Ok(Signature::from_bytes(&bytes))
}

/// Check that `signature` was made by `pub_key` over exactly `message`
pub fn verify_wallet_signature(pub_key: &str, signature: &str, message: &[u8]) -> Result<()> {
    let key = decode_public_key(pub_key)?;
    let signature = decode_signature(signature)?;
    key.verify_strict(message, &signature)
        .map_err(|_| AuthError::InvalidSignature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{KeypairWallet, WalletAdapter};

    async fn signed(wallet: &KeypairWallet, message: &[u8]) -> String {
        BASE64.encode(wallet.sign_message(message).await.unwrap())
    }

    #[tokio::test]
    async fn test_valid_signature_verifies() {
        let wallet = KeypairWallet::generate().connected();
        let signature = signed(&wallet, b"challenge").await;

        assert!(verify_wallet_signature(wallet.address(), &signature, b"challenge").is_ok());
    }

    #[tokio::test]
    async fn test_signature_bound_to_message_bytes() {
        let wallet = KeypairWallet::generate().connected();
        let signature = signed(&wallet, b"challenge").await;

        let err = verify_wallet_signature(wallet.address(), &signature, b"challenge!").unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_signature_bound_to_key() {
        let wallet = KeypairWallet::generate().connected();
        let other = KeypairWallet::generate();
        let signature = signed(&wallet, b"challenge").await;

        let err = verify_wallet_signature(other.address(), &signature, b"challenge").unwrap_err();
        assert!(matches!(err, AuthError::InvalidSignature));
    }

    #[test]
    fn test_malformed_public_keys() {
        for pub_key in ["", "0OIl", "Bk9...Xy2", "3yZe7d"] {
            let err = decode_public_key(pub_key).unwrap_err();
            assert!(
                matches!(err, AuthError::UnknownPublicKeyFormat(_)),
                "{pub_key}: {err:?}"
            );
        }
    }

    #[test]
    fn test_malformed_signatures() {
        assert!(matches!(
            decode_signature("not base64!"),
            Err(AuthError::InvalidSignature)
        ));
        assert!(matches!(
            decode_signature(&BASE64.encode([7u8; 10])),
            Err(AuthError::InvalidSignature)
        ));
    }
}
