/*
[INPUT]:  Solana secret key (base58 seed or keypair) and messages to sign
[OUTPUT]: Base58 wallet address and raw ed25519 signatures
[POS]:    Auth layer - local keypair wallet implementation
[UPDATE]: When the accepted key encodings change
*/

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use crate::auth::wallet::WalletAdapter;
use crate::http::{AuthError, Result};

/// Wallet backed by an ed25519 keypair held in process
///
/// Behaves like a browser wallet: it has to be connected before it hands out
/// its public key or signs anything.
#[derive(Debug)]
pub struct KeypairWallet {
    signing_key: SigningKey,
    address: String,
    connected: AtomicBool,
}

impl KeypairWallet {
    /// Create a wallet from a base58-encoded private key
    /// Supports 64-byte keypair or 32-byte seed
    pub fn new(private_key_base58: &str) -> Result<Self> {
        let bytes = bs58::decode(private_key_base58.trim())
            .into_vec()
            .map_err(|e| AuthError::Config(format!("Invalid base58 private key: {}", e)))?;

        let signing_key = match bytes.len() {
            64 => {
                let mut keypair = [0u8; 64];
                keypair.copy_from_slice(&bytes);
                SigningKey::from_keypair_bytes(&keypair)
                    .map_err(|e| AuthError::Config(format!("Invalid keypair bytes: {}", e)))?
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(&bytes);
                SigningKey::from_bytes(&seed)
            }
            other => {
                return Err(AuthError::Config(format!(
                    "Invalid private key length: expected 32 or 64 bytes, got {}",
                    other
                )));
            }
        };

        Ok(Self::from_signing_key(signing_key))
    }

    /// Generate a new random keypair
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Create a wallet from existing secret key bytes (32 bytes)
    pub fn from_secret_key(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = bs58::encode(signing_key.verifying_key().as_bytes()).into_string();
        Self {
            signing_key,
            address,
            connected: AtomicBool::new(false),
        }
    }

    /// Connected copy, for flows that assume the user already approved
    pub fn connected(self) -> Self {
        self.connected.store(true, Ordering::SeqCst);
        self
    }

    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Base58 address regardless of connection state
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Get the raw secret key bytes
    pub fn secret_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// 32-byte seed in base58, the format accepted by [`KeypairWallet::new`]
    pub fn secret_key_base58(&self) -> String {
        bs58::encode(self.signing_key.to_bytes()).into_string()
    }
}

#[async_trait]
impl WalletAdapter for KeypairWallet {
    fn name(&self) -> &str {
        "keypair"
    }

    fn public_key(&self) -> Option<String> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.address.clone())
    }

    async fn connect(&self) -> Result<String> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(self.address.clone())
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(AuthError::NoWalletConnected);
        }
        let signature = self.signing_key.sign(message);
        Ok(signature.to_bytes().to_vec())
    }
}
