//! Speech synthesis system

pub mod backends;
pub mod config;
pub mod event;
pub mod result;
pub mod ssml;
pub mod synthesizer;

pub use backends::{AzureSpeechService, AzureSynthesizer};
pub use config::{OutputFormat, SpeechConfig, SubscriptionKey};
pub use event::{EventDispatcher, EventHandler, EventSequence, SynthesisEvent, SynthesisPhase};
pub use result::{
    CancellationDetails, CancellationErrorCode, CancellationReason, ResultReason, SynthesisResult,
};
pub use synthesizer::{AudioSink, OutcomeSender, SpeakTask, SpeechClient, SpeechService};
