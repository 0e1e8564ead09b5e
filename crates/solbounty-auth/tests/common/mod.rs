/*
[INPUT]:  Test configuration and mock server requirements
[OUTPUT]: Shared test utilities, fixtures, and mock helpers
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When adding new test patterns or fixtures
*/

//! Common test utilities for solbounty-auth tests

#![allow(dead_code)]

use std::sync::Arc;

use solbounty_auth::{
    IdentityRegistry,
    KeypairWallet,
    LocalBackend,
    NegotiatorConfig,
    ReferenceVerifier,
    SignerAdapter,
    VerificationRequest,
    compose,
};
use wiremock::MockServer;

pub const TEST_ORIGIN: &str = "https://solbounty.test";

/// Setup a mock HTTP server for testing
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Deterministic wallet so addresses are stable across runs
pub fn test_wallet() -> KeypairWallet {
    KeypairWallet::from_secret_key(&[1u8; 32]).connected()
}

pub fn negotiator_config() -> NegotiatorConfig {
    NegotiatorConfig {
        origin: TEST_ORIGIN.to_string(),
        ..NegotiatorConfig::default()
    }
}

/// Fresh verifier with an empty registry
pub fn reference_verifier() -> Arc<ReferenceVerifier> {
    Arc::new(ReferenceVerifier::new(Arc::new(IdentityRegistry::default())))
}

pub fn local_backend(verifier: &Arc<ReferenceVerifier>) -> LocalBackend {
    LocalBackend::new(verifier.clone(), TEST_ORIGIN).expect("test origin is canonical")
}

/// Sign the challenge for `origin` the way a client would
pub async fn signed_request(wallet: &KeypairWallet, origin: &str) -> VerificationRequest {
    let message = compose(origin, wallet.address()).expect("valid challenge inputs");
    SignerAdapter::default()
        .request_signature(wallet, message)
        .await
        .expect("keypair wallet signs")
        .into()
}

/// Mock session cookie for testing
pub fn mock_session_cookie() -> String {
    "session=3f1c0d7e9a2b4c6d8e0f1a2b3c4d5e6f".to_string()
}
