/*
[INPUT]:  HTTP client configuration and identity API endpoints
[OUTPUT]: HTTP responses and typed API results
[POS]:    HTTP layer - REST API communication
[UPDATE]: When adding new endpoints or changing client behavior
*/

pub mod client;
pub mod error;
pub mod identity;

pub use error::{AuthError, FailureKind, FlowStage, Result};

pub use client::{ClientConfig, IdentityClient};
