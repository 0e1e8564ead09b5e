/*
[INPUT]:  Challenge message and a connected wallet capability
[OUTPUT]: Base64 signature bundled with the exact signed message
[POS]:    Auth layer - client-side signer adapter
[UPDATE]: When changing signature encoding or signing preconditions
*/

use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use tracing::debug;

use crate::auth::challenge::ChallengeMessage;
use crate::auth::wallet::WalletAdapter;
use crate::http::{AuthError, FlowStage, Result};
use crate::types::VerificationRequest;

const DEFAULT_SIGN_TIMEOUT: Duration = Duration::from_secs(120);

/// Signature together with everything needed to submit it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedChallenge {
    pub public_key: String,
    pub message: ChallengeMessage,
    /// Standard base64 of the raw signature bytes
    pub signature: String,
}

impl From<SignedChallenge> for VerificationRequest {
    fn from(signed: SignedChallenge) -> Self {
        VerificationRequest {
            pub_key: signed.public_key,
            signature: signed.signature,
            message: signed.message.into_string(),
        }
    }
}

/// Obtains signatures from a wallet without touching its private key
#[derive(Debug, Clone)]
pub struct SignerAdapter {
    timeout: Duration,
}

impl Default for SignerAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_SIGN_TIMEOUT)
    }
}

impl SignerAdapter {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Ask `wallet` to sign `message`
    ///
    /// Fails with `NoWalletConnected` before prompting when the wallet is not
    /// connected or cannot sign. The submitted key is the one embedded in
    /// `message`; a wallet now on another account is refused unprompted.
    pub async fn request_signature(
        &self,
        wallet: &dyn WalletAdapter,
        message: ChallengeMessage,
    ) -> Result<SignedChallenge> {
        let connected = wallet.public_key().ok_or(AuthError::NoWalletConnected)?;
        if !wallet.can_sign() {
            return Err(AuthError::NoWalletConnected);
        }
        let public_key = message.public_key().to_string();
        if connected != public_key {
            return Err(AuthError::SignerUnavailable(format!(
                "wallet switched to {connected} while the challenge is for {public_key}"
            )));
        }

        debug!(wallet = wallet.name(), %public_key, "requesting signature");
        let raw = tokio::time::timeout(self.timeout, wallet.sign_message(message.as_bytes()))
            .await
            .map_err(|_| AuthError::Timeout {
                stage: FlowStage::Signature,
                duration: self.timeout.as_secs(),
            })??;

        if raw.is_empty() {
            return Err(AuthError::SignerUnavailable(
                "wallet returned an empty signature".to_string(),
            ));
        }

        Ok(SignedChallenge {
            public_key,
            message,
            signature: BASE64.encode(raw),
        })
    }
}
