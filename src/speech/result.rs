//! Synthesis results and cancellation details
//!
//! Numeric codes match the ones the vendor SDKs report, so diagnostics such as
//! `CANCELED: Reason=1.` read the same as the service documentation.

use crate::{Result, SpeakError};
use bytes::Bytes;
use std::fmt;

/// Why a result was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultReason {
    Canceled,
    SynthesizingAudio,
    SynthesizingAudioCompleted,
    SynthesizingAudioStarted,
}

impl ResultReason {
    pub fn code(&self) -> u32 {
        match self {
            Self::Canceled => 1,
            Self::SynthesizingAudio => 8,
            Self::SynthesizingAudioCompleted => 9,
            Self::SynthesizingAudioStarted => 12,
        }
    }
}

impl fmt::Display for ResultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Why a synthesis was canceled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationReason {
    Error,
    EndOfStream,
    CancelledByUser,
}

impl CancellationReason {
    pub fn code(&self) -> u32 {
        match self {
            Self::Error => 1,
            Self::EndOfStream => 2,
            Self::CancelledByUser => 3,
        }
    }
}

impl fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Service or transport error behind an error cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationErrorCode {
    NoError,
    AuthenticationFailure,
    BadRequest,
    TooManyRequests,
    Forbidden,
    ConnectionFailure,
    ServiceTimeout,
    ServiceError,
    ServiceUnavailable,
    RuntimeError,
}

impl CancellationErrorCode {
    pub fn code(&self) -> u32 {
        match self {
            Self::NoError => 0,
            Self::AuthenticationFailure => 1,
            Self::BadRequest => 2,
            Self::TooManyRequests => 3,
            Self::Forbidden => 4,
            Self::ConnectionFailure => 5,
            Self::ServiceTimeout => 6,
            Self::ServiceError => 7,
            Self::ServiceUnavailable => 8,
            Self::RuntimeError => 9,
        }
    }

    /// Classify a non-success HTTP status returned by the service
    pub fn from_http_status(status: u16) -> Self {
        match status {
            401 => Self::AuthenticationFailure,
            403 => Self::Forbidden,
            400 | 415 => Self::BadRequest,
            429 => Self::TooManyRequests,
            408 | 504 => Self::ServiceTimeout,
            503 => Self::ServiceUnavailable,
            500..=599 => Self::ServiceError,
            _ => Self::RuntimeError,
        }
    }
}

impl fmt::Display for CancellationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Details of a canceled synthesis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationDetails {
    pub reason: CancellationReason,
    pub error_code: CancellationErrorCode,
    pub error_details: String,
}

impl CancellationDetails {
    pub fn error(error_code: CancellationErrorCode, error_details: impl Into<String>) -> Self {
        Self {
            reason: CancellationReason::Error,
            error_code,
            error_details: error_details.into(),
        }
    }

    /// Cancellation details of a result, `None` unless it was canceled
    pub fn from_result(result: &SynthesisResult) -> Option<Self> {
        if result.reason != ResultReason::Canceled {
            return None;
        }
        Some(result.cancellation.clone().unwrap_or(Self {
            reason: CancellationReason::CancelledByUser,
            error_code: CancellationErrorCode::NoError,
            error_details: String::new(),
        }))
    }
}

impl fmt::Display for CancellationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reason={} error_code={} details=[{}]",
            self.reason, self.error_code, self.error_details
        )
    }
}

/// Final result of one speak call
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    pub result_id: String,
    pub reason: ResultReason,
    pub audio_data: Bytes,
    cancellation: Option<CancellationDetails>,
}

impl SynthesisResult {
    pub fn completed(result_id: impl Into<String>, audio_data: Bytes) -> Self {
        Self {
            result_id: result_id.into(),
            reason: ResultReason::SynthesizingAudioCompleted,
            audio_data,
            cancellation: None,
        }
    }

    pub fn canceled(
        result_id: impl Into<String>,
        audio_data: Bytes,
        details: CancellationDetails,
    ) -> Self {
        Self {
            result_id: result_id.into(),
            reason: ResultReason::Canceled,
            audio_data,
            cancellation: Some(details),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.reason == ResultReason::SynthesizingAudioCompleted
    }

    pub fn audio_len(&self) -> usize {
        self.audio_data.len()
    }

    /// Audio of a completed result, or the cancellation as an error
    pub fn into_completed(self) -> Result<Bytes> {
        match CancellationDetails::from_result(&self) {
            None => Ok(self.audio_data),
            Some(details) => Err(SpeakError::Canceled(details)),
        }
    }
}
