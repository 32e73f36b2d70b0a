//! Speech synthesizer abstraction
//!
//! The workflow only talks to a [`SpeechClient`]: register event handlers,
//! start a synthesis, close. A [`SpeechService`] opens clients from a
//! [`SpeechConfig`]; the Azure REST backend is one such service, and tests
//! substitute scripted ones.

use super::config::SpeechConfig;
use super::event::{EventHandler, SynthesisPhase};
use super::result::SynthesisResult;
use crate::{Result, SpeakError};
use log::debug;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Where synthesized audio goes besides the returned result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSink {
    /// Write the complete audio to a file once synthesis finishes
    File(PathBuf),
}

impl AudioSink {
    /// Check that the sink can be written to before a client accepts it
    pub fn attach(&self) -> Result<()> {
        match self {
            AudioSink::File(path) => {
                let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
                if let Some(dir) = parent {
                    if !dir.is_dir() {
                        return Err(SpeakError::Client(format!(
                            "Audio output directory does not exist: {}",
                            dir.display()
                        )));
                    }
                }
                if path.is_dir() {
                    return Err(SpeakError::Client(format!(
                        "Audio output path is a directory: {}",
                        path.display()
                    )));
                }
                Ok(())
            }
        }
    }

    /// Write finished audio into the sink
    pub async fn write(&self, audio: &[u8]) -> Result<()> {
        match self {
            AudioSink::File(path) => {
                tokio::fs::write(path, audio).await?;
                debug!("Wrote {} bytes of audio to {}", audio.len(), path.display());
                Ok(())
            }
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            AudioSink::File(path) => path,
        }
    }
}

/// Sending half of a speak call's outcome
pub struct OutcomeSender {
    result_id: String,
    tx: oneshot::Sender<Result<SynthesisResult>>,
}

impl OutcomeSender {
    /// Resolve the speak call; returns false if nobody is waiting anymore
    pub fn resolve(self, outcome: Result<SynthesisResult>) -> bool {
        if self.tx.send(outcome).is_err() {
            debug!("Outcome for {} discarded: no longer awaited", self.result_id);
            return false;
        }
        true
    }
}

/// Handle to a running synthesis
///
/// Resolves exactly once with the outcome. Dropping the handle abandons the
/// outcome; the synthesis itself keeps running until the service answers.
pub struct SpeakTask {
    result_id: String,
    rx: oneshot::Receiver<Result<SynthesisResult>>,
}

impl SpeakTask {
    pub fn channel(result_id: impl Into<String>) -> (OutcomeSender, SpeakTask) {
        let result_id = result_id.into();
        let (tx, rx) = oneshot::channel();
        (
            OutcomeSender {
                result_id: result_id.clone(),
                tx,
            },
            SpeakTask { result_id, rx },
        )
    }

    pub fn result_id(&self) -> &str {
        &self.result_id
    }
}

impl Future for SpeakTask {
    type Output = Result<SynthesisResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(SpeakError::Speak(
                    "synthesis ended without producing a result".to_string(),
                ))
            })
        })
    }
}

/// A connected speech synthesizer
pub trait SpeechClient: Send + Sync {
    /// Register the handler for one phase; a later call for the same phase replaces it
    fn subscribe(&self, phase: SynthesisPhase, handler: Arc<dyn EventHandler>);

    /// Start synthesizing plain text
    fn speak(&self, text: &str) -> Result<SpeakTask>;

    /// Start synthesizing a caller-built SSML document
    fn speak_ssml(&self, ssml: &str) -> Result<SpeakTask>;

    /// Release the client; events still in flight are dropped
    ///
    /// Only the first call has any effect.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Opens speech clients
pub trait SpeechService {
    fn open_client(
        &self,
        config: SpeechConfig,
        sink: Option<AudioSink>,
    ) -> Result<Box<dyn SpeechClient>>;
}
