//! Speech service backends

// Azure Speech REST API
pub mod azure;

pub use azure::{AzureSpeechService, AzureSynthesizer};
