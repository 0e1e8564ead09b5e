/*
[INPUT]:  Public API exports for solbounty-cli crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod flow;
pub mod session_store;

// Re-export main types for convenience
pub use config::AppConfig;
pub use flow::{SimulationReport, run_remote, simulate};
pub use session_store::{SessionStore, StoredSession};
