//! cloudspeak - cloud text-to-speech client
//!
//! Sends text to a cloud speech service, reports synthesis progress as it
//! arrives, and gives up cleanly when the service does not answer in time.

pub mod console;
pub mod error;
pub mod settings;
pub mod speech;
pub mod workflow;

pub use error::{Result, SpeakError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "cloudspeak";
