/*
[INPUT]:  Verification triples submitted by clients
[OUTPUT]: Identities, wallet bindings and sessions
[POS]:    Verifier layer - reference server side of wallet-linked authentication
[UPDATE]: When verification rules or identity storage change
*/

pub mod local;
pub mod registry;
pub mod service;
pub mod signature;

pub use local::LocalBackend;
pub use registry::{Identity, IdentityRegistry, Resolution, SessionGrant};
pub use service::{ReferenceVerifier, VerifiedLogin};
pub use signature::{decode_public_key, decode_signature, verify_wallet_signature};
