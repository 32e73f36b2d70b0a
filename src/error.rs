//! Error types for cloudspeak

use crate::speech::CancellationDetails;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Main error type for cloudspeak
#[derive(Error, Debug)]
pub enum SpeakError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Synthesizer error: {0}")]
    Client(String),

    #[error("Speech synthesis error: {0}")]
    Speak(String),

    #[error("Synthesis canceled: {0}")]
    Canceled(CancellationDetails),

    #[error("Speech synthesis timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for cloudspeak operations
pub type Result<T> = std::result::Result<T, SpeakError>;

impl From<url::ParseError> for SpeakError {
    fn from(e: url::ParseError) -> Self {
        SpeakError::Config(format!("invalid endpoint URL: {}", e))
    }
}
