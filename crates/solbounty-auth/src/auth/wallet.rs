/*
[INPUT]:  Wallet provider behaviour (connect prompt, sign prompt)
[OUTPUT]: Public key and raw signature bytes
[POS]:    Auth layer - wallet capability abstraction
[UPDATE]: When adding new wallet providers or changing the capability surface
*/

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::http::{AuthError, Result};

/// Capability of an external wallet the user controls
///
/// The application never sees the private key; it can only ask the wallet to
/// connect and to sign. Both calls may suspend on a user prompt.
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Provider name, for logs
    fn name(&self) -> &str;

    /// Base58 public key if the wallet is connected
    fn public_key(&self) -> Option<String>;

    /// Whether the wallet exposes message signing
    fn can_sign(&self) -> bool {
        true
    }

    /// Ask the user to connect; resolves with the base58 public key
    async fn connect(&self) -> Result<String>;

    /// Ask the user to sign `message`; resolves with raw signature bytes
    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>>;
}

/// How a [`MockWallet`] answers the signature prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockSignBehavior {
    Sign(Vec<u8>),
    Reject,
    Fail(String),
    /// Never resolves, like a prompt the user walked away from
    Hang,
}

/// How a [`MockWallet`] answers the connect prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockConnectBehavior {
    Approve,
    Refuse,
    Hang,
}

/// Mock wallet for testing
#[derive(Debug)]
pub struct MockWallet {
    address: String,
    connected: AtomicBool,
    connect: MockConnectBehavior,
    can_sign: bool,
    behavior: Mutex<MockSignBehavior>,
    sign_calls: AtomicUsize,
    signed: Mutex<Vec<Vec<u8>>>,
}

impl MockWallet {
    /// Create a disconnected mock that signs with a predetermined signature
    pub fn new(address: &str, signature: &[u8]) -> Self {
        Self {
            address: address.to_string(),
            connected: AtomicBool::new(false),
            connect: MockConnectBehavior::Approve,
            can_sign: true,
            behavior: Mutex::new(MockSignBehavior::Sign(signature.to_vec())),
            sign_calls: AtomicUsize::new(0),
            signed: Mutex::new(Vec::new()),
        }
    }

    pub fn connected(self) -> Self {
        self.connected.store(true, Ordering::SeqCst);
        self
    }

    /// Connect prompt is dismissed
    pub fn refusing_connect(mut self) -> Self {
        self.connect = MockConnectBehavior::Refuse;
        self
    }

    /// Connect prompt is never answered
    pub fn hanging_connect(mut self) -> Self {
        self.connect = MockConnectBehavior::Hang;
        self
    }

    /// Wallet connects but offers no signMessage capability
    pub fn without_signing(mut self) -> Self {
        self.can_sign = false;
        self
    }

    pub fn with_behavior(self, behavior: MockSignBehavior) -> Self {
        self.set_behavior(behavior);
        self
    }

    pub fn set_behavior(&self, behavior: MockSignBehavior) {
        let mut guard = self.behavior.lock().unwrap_or_else(|e| e.into_inner());
        *guard = behavior;
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    /// Messages the wallet was asked to sign, in order
    pub fn signed_messages(&self) -> Vec<Vec<u8>> {
        self.signed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl WalletAdapter for MockWallet {
    fn name(&self) -> &str {
        "mock"
    }

    fn public_key(&self) -> Option<String> {
        self.connected
            .load(Ordering::SeqCst)
            .then(|| self.address.clone())
    }

    fn can_sign(&self) -> bool {
        self.can_sign
    }

    async fn connect(&self) -> Result<String> {
        match self.connect {
            MockConnectBehavior::Approve => {
                self.connected.store(true, Ordering::SeqCst);
                Ok(self.address.clone())
            }
            MockConnectBehavior::Refuse => Err(AuthError::NoWalletConnected),
            MockConnectBehavior::Hang => std::future::pending().await,
        }
    }

    async fn sign_message(&self, message: &[u8]) -> Result<Vec<u8>> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        self.signed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_vec());

        let behavior = self
            .behavior
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match behavior {
            MockSignBehavior::Sign(signature) => Ok(signature),
            MockSignBehavior::Reject => Err(AuthError::UserRejectedSignature),
            MockSignBehavior::Fail(reason) => Err(AuthError::SignerUnavailable(reason)),
            MockSignBehavior::Hang => std::future::pending().await,
        }
    }
}
