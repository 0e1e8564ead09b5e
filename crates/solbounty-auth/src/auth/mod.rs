/*
[INPUT]:  Wallet capability, origin and identity backend
[OUTPUT]: Challenge messages, signatures and negotiated sessions
[POS]:    Auth layer - client side of wallet-linked authentication
[UPDATE]: When auth flow or signature methods change
*/

pub mod challenge;
pub mod key_store;
pub mod keypair_wallet;
pub mod negotiator;
pub mod session;
pub mod signer;
pub mod state;
pub mod wallet;

pub use challenge::{ChallengeMessage, canonical_origin, compose};
pub use key_store::WalletKeyStore;
pub use keypair_wallet::KeypairWallet;
pub use negotiator::{
    BackendReply,
    FlowOutcome,
    IdentityBackend,
    NegotiatorConfig,
    SessionNegotiator,
};
pub use session::{SessionCredential, SessionData, SessionTracker};
pub use signer::{SignedChallenge, SignerAdapter};
pub use state::{FlowEvent, FlowStateMachine, Intent, NegotiatorState, StateError};
pub use wallet::{MockConnectBehavior, MockSignBehavior, MockWallet, WalletAdapter};
