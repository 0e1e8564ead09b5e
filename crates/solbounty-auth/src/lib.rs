/*
[INPUT]:  Crate modules and public type definitions
[OUTPUT]: Public SolBounty wallet-auth crate surface
[POS]:    Crate root - module wiring
[UPDATE]: When public modules or exports change
*/

pub mod auth;
pub mod http;
pub mod types;
pub mod verifier;

// Re-export commonly used types from auth
pub use auth::{
    BackendReply,
    ChallengeMessage,
    FlowOutcome,
    IdentityBackend,
    Intent,
    KeypairWallet,
    MockWallet,
    NegotiatorConfig,
    NegotiatorState,
    SessionCredential,
    SessionNegotiator,
    SessionTracker,
    SignerAdapter,
    WalletAdapter,
    WalletKeyStore,
    compose,
};

// Re-export commonly used types from http
pub use http::{
    AuthError,
    ClientConfig,
    FailureKind,
    FlowStage,
    IdentityClient,
    Result,
};

// Re-export all types
pub use types::*;

// Re-export the reference verifier
pub use verifier::{
    IdentityRegistry,
    LocalBackend,
    ReferenceVerifier,
};
