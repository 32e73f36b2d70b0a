//! Synthesis workflow
//!
//! Runs one synthesis from start to finish:
//!
//! ```text
//! Idle -> Configuring -> ClientOpen -> Speaking -> { Succeeded | CanceledOutcome | Errored | TimedOut } -> Closed
//! ```
//!
//! Every failure is reported on the console and ends the workflow; nothing is
//! retried and nothing is fatal to the process. Whatever terminal state is
//! reached, the outcome (if any) is released first and then the client is
//! closed, exactly once.
//!
//! On timeout the workflow stops waiting: the speak handle is dropped, so an
//! outcome arriving later has no receiver and is discarded by the client, and
//! closing the client stops any trailing events from reaching the handlers.
//! The request itself is not canceled at the service.

use crate::console::{Console, ConsoleReporter};
use crate::settings::{Settings, DEFAULT_TIMEOUT_SECS};
use crate::speech::{
    CancellationDetails, CancellationReason, SpeechClient, SpeechConfig, SpeechService,
    SynthesisPhase,
};
use crate::{Result, SpeakError};
use log::{debug, warn};
use std::fmt;
use std::time::Duration;

/// Where the workflow currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Configuring,
    ClientOpen,
    Speaking,
    Succeeded,
    CanceledOutcome,
    Errored,
    TimedOut,
    Closed,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::CanceledOutcome | Self::Errored | Self::TimedOut
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What a finished workflow run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowReport {
    /// Terminal state reached before closing
    pub outcome: WorkflowState,
    /// Length of the synthesized audio, for a successful run
    pub audio_len: Option<usize>,
    /// Cancellation details, when the service canceled the synthesis
    pub cancellation: Option<CancellationDetails>,
}

impl WorkflowReport {
    fn new(outcome: WorkflowState) -> Self {
        Self {
            outcome,
            audio_len: None,
            cancellation: None,
        }
    }
}

/// Drives a single speak call against a speech service
pub struct SynthesisWorkflow<S: SpeechService> {
    service: S,
    console: Console,
    timeout: Duration,
    state: WorkflowState,
    history: Vec<WorkflowState>,
}

impl<S: SpeechService> SynthesisWorkflow<S> {
    pub fn new(service: S, console: Console) -> Self {
        Self {
            service,
            console,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            state: WorkflowState::Idle,
            history: vec![WorkflowState::Idle],
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    /// Every state visited so far, starting with `Idle`
    pub fn history(&self) -> &[WorkflowState] {
        &self.history
    }

    fn transition(&mut self, next: WorkflowState) {
        debug!("Workflow {} -> {}", self.state, next);
        self.state = next;
        self.history.push(next);
    }

    /// Synthesize the configured text with the configured credentials
    pub async fn run(&mut self, settings: &Settings) -> WorkflowReport {
        let text = settings.text();
        self.run_with(settings.speech_config(), &text).await
    }

    /// Synthesize `text` using an already built (or failed) configuration
    pub async fn run_with(&mut self, config: Result<SpeechConfig>, text: &str) -> WorkflowReport {
        self.transition(WorkflowState::Configuring);
        let config = match config {
            Ok(config) => config,
            Err(e) => {
                self.console.println(&format!("Speech config error: {}", e));
                return self.finish(WorkflowReport::new(WorkflowState::Errored), None);
            }
        };

        // No audio sink: the audio is only returned, never played locally
        let client = match self.service.open_client(config, None) {
            Ok(client) => client,
            Err(e) => {
                self.console.println(&format!("Speech synthesizer error: {}", e));
                return self.finish(WorkflowReport::new(WorkflowState::Errored), None);
            }
        };
        self.transition(WorkflowState::ClientOpen);

        let reporter = ConsoleReporter::new(self.console.clone());
        for phase in SynthesisPhase::ALL {
            client.subscribe(phase, reporter.clone());
        }

        self.transition(WorkflowState::Speaking);
        let report = self.speak(client.as_ref(), text).await;
        self.finish(report, Some(client))
    }

    async fn speak(&mut self, client: &dyn SpeechClient, text: &str) -> WorkflowReport {
        let task = match client.speak(text) {
            Ok(task) => task,
            Err(e) => {
                self.console.println(&format!("Speech synthesis error: {}", e));
                return WorkflowReport::new(WorkflowState::Errored);
            }
        };
        debug!("Waiting up to {:?} for {}", self.timeout, task.result_id());

        let outcome = tokio::select! {
            outcome = task => outcome,
            _ = tokio::time::sleep(self.timeout) => {
                warn!("{}", SpeakError::Timeout(self.timeout));
                self.console.println("Speech synthesis timed out");
                return WorkflowReport::new(WorkflowState::TimedOut);
            }
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                self.console.println(&format!("Speech synthesis error: {}", e));
                return WorkflowReport::new(WorkflowState::Errored);
            }
        };

        if result.is_completed() {
            self.console.println(&format!(
                "Speech synthesized successfully for text [{}].",
                text
            ));
            return WorkflowReport {
                outcome: WorkflowState::Succeeded,
                audio_len: Some(result.audio_len()),
                cancellation: None,
            };
        }

        let Some(details) = CancellationDetails::from_result(&result) else {
            self.console.println(&format!(
                "Speech synthesis error: unexpected result reason {}",
                result.reason
            ));
            return WorkflowReport::new(WorkflowState::Errored);
        };

        self.console
            .println(&format!("CANCELED: Reason={}.", details.reason));
        if details.reason == CancellationReason::Error {
            self.console
                .println(&format!("CANCELED: ErrorCode={}", details.error_code));
            self.console
                .println(&format!("CANCELED: ErrorDetails=[{}]", details.error_details));
            self.console
                .println("CANCELED: Did you set the speech resource key and region values?");
        }

        WorkflowReport {
            outcome: WorkflowState::CanceledOutcome,
            audio_len: None,
            cancellation: Some(details),
        }
    }

    fn finish(
        &mut self,
        report: WorkflowReport,
        client: Option<Box<dyn SpeechClient>>,
    ) -> WorkflowReport {
        self.transition(report.outcome);
        if let Some(client) = client {
            client.close();
        }
        self.transition(WorkflowState::Closed);
        report
    }
}
