//! Workflow tests
//!
//! Drive the synthesis workflow against a scripted speech client and check
//! the terminal state, the console output, and that the client is closed
//! exactly once on every path.

use bytes::Bytes;
use cloudspeak::console::Console;
use cloudspeak::speech::{
    AudioSink, CancellationDetails, CancellationErrorCode, CancellationReason, EventDispatcher,
    EventHandler,
    SpeakTask, SpeechClient, SpeechConfig, SpeechService, SynthesisPhase, SynthesisResult,
};
use cloudspeak::workflow::{SynthesisWorkflow, WorkflowState};
use cloudspeak::{Result, SpeakError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
enum ScriptedOutcome {
    Completed(usize),
    Canceled(CancellationDetails),
    Error(String),
}

#[derive(Clone)]
struct Script {
    events: Vec<(SynthesisPhase, usize)>,
    outcome: ScriptedOutcome,
    /// Delay before the outcome is resolved
    delay: Duration,
    reject_speak: bool,
}

impl Script {
    fn new(events: Vec<(SynthesisPhase, usize)>, outcome: ScriptedOutcome) -> Self {
        Self {
            events,
            outcome,
            delay: Duration::from_millis(10),
            reject_speak: false,
        }
    }
}

#[derive(Default)]
struct Counters {
    opens: AtomicUsize,
    closes: AtomicUsize,
    late_outcome_discarded: AtomicBool,
}

struct ScriptedService {
    script: Script,
    counters: Arc<Counters>,
    fail_open: bool,
}

impl ScriptedService {
    fn new(script: Script) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        (
            Self {
                script,
                counters: Arc::clone(&counters),
                fail_open: false,
            },
            counters,
        )
    }
}

impl SpeechService for ScriptedService {
    fn open_client(
        &self,
        _config: SpeechConfig,
        sink: Option<AudioSink>,
    ) -> Result<Box<dyn SpeechClient>> {
        assert!(sink.is_none(), "workflow must not attach an audio sink");
        if self.fail_open {
            return Err(SpeakError::Client("cannot reach service".to_string()));
        }
        self.counters.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedClient {
            script: self.script.clone(),
            counters: Arc::clone(&self.counters),
            dispatcher: EventDispatcher::new(),
        }))
    }
}

struct ScriptedClient {
    script: Script,
    counters: Arc<Counters>,
    dispatcher: Arc<EventDispatcher>,
}

impl SpeechClient for ScriptedClient {
    fn subscribe(&self, phase: SynthesisPhase, handler: Arc<dyn EventHandler>) {
        self.dispatcher.subscribe(phase, handler);
    }

    fn speak(&self, _text: &str) -> Result<SpeakTask> {
        if self.script.reject_speak {
            return Err(SpeakError::Speak("service refused the request".to_string()));
        }
        let (outcome, task) = SpeakTask::channel("scripted-1");
        let mut events = self.dispatcher.sequence("scripted-1");
        let script = self.script.clone();
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            for (phase, len) in script.events {
                tokio::time::sleep(Duration::from_millis(1)).await;
                events.emit(phase, len);
            }
            tokio::time::sleep(script.delay).await;
            let result = match script.outcome {
                ScriptedOutcome::Completed(len) => Ok(SynthesisResult::completed(
                    "scripted-1",
                    Bytes::from(vec![0u8; len]),
                )),
                ScriptedOutcome::Canceled(details) => Ok(SynthesisResult::canceled(
                    "scripted-1",
                    Bytes::new(),
                    details,
                )),
                ScriptedOutcome::Error(msg) => Err(SpeakError::Speak(msg)),
            };
            if !outcome.resolve(result) {
                counters.late_outcome_discarded.store(true, Ordering::SeqCst);
            }
        });

        Ok(task)
    }

    fn speak_ssml(&self, ssml: &str) -> Result<SpeakTask> {
        self.speak(ssml)
    }

    fn close(&self) {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        self.dispatcher.close();
    }

    fn is_closed(&self) -> bool {
        self.dispatcher.is_closed()
    }
}

fn config() -> Result<SpeechConfig> {
    SpeechConfig::from_subscription("test-key", "eastus")
}

#[tokio::test(start_paused = true)]
async fn test_successful_synthesis() {
    let script = Script::new(
        vec![
            (SynthesisPhase::Started, 0),
            (SynthesisPhase::Progress, 1024),
            (SynthesisPhase::Progress, 2048),
            (SynthesisPhase::Completed, 3072),
        ],
        ScriptedOutcome::Completed(3072),
    );
    let (service, counters) = ScriptedService::new(script);
    let console = Console::capture();
    let mut workflow = SynthesisWorkflow::new(service, console.clone());

    let report = workflow.run_with(config(), "Hello").await;

    assert_eq!(report.outcome, WorkflowState::Succeeded);
    assert_eq!(report.audio_len, Some(3072));
    assert_eq!(
        console.lines(),
        vec![
            "Synthesis started.",
            "Synthesizing, audio chunk size 1024.",
            "Synthesizing, audio chunk size 2048.",
            "Synthesized, audio length 3072.",
            "Speech synthesized successfully for text [Hello].",
        ]
    );
    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
    assert_eq!(
        workflow.history(),
        &[
            WorkflowState::Idle,
            WorkflowState::Configuring,
            WorkflowState::ClientOpen,
            WorkflowState::Speaking,
            WorkflowState::Succeeded,
            WorkflowState::Closed,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_canceled_with_error() {
    let details = CancellationDetails::error(
        CancellationErrorCode::AuthenticationFailure,
        "HTTP 401 Unauthorized",
    );
    let script = Script::new(
        vec![(SynthesisPhase::Started, 0), (SynthesisPhase::Canceled, 0)],
        ScriptedOutcome::Canceled(details.clone()),
    );
    let (service, counters) = ScriptedService::new(script);
    let console = Console::capture();
    let mut workflow = SynthesisWorkflow::new(service, console.clone());

    let report = workflow.run_with(config(), "Hello").await;

    assert_eq!(report.outcome, WorkflowState::CanceledOutcome);
    assert_eq!(report.cancellation, Some(details));
    assert_eq!(
        console.lines(),
        vec![
            "Synthesis started.",
            "Received a cancellation.",
            "CANCELED: Reason=1.",
            "CANCELED: ErrorCode=1",
            "CANCELED: ErrorDetails=[HTTP 401 Unauthorized]",
            "CANCELED: Did you set the speech resource key and region values?",
        ]
    );
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_canceled_without_error() {
    let details = CancellationDetails {
        reason: CancellationReason::EndOfStream,
        error_code: CancellationErrorCode::NoError,
        error_details: String::new(),
    };
    let script = Script::new(
        vec![(SynthesisPhase::Started, 0), (SynthesisPhase::Canceled, 0)],
        ScriptedOutcome::Canceled(details.clone()),
    );
    let (service, counters) = ScriptedService::new(script);
    let console = Console::capture();
    let mut workflow = SynthesisWorkflow::new(service, console.clone());

    let report = workflow.run_with(config(), "Hello").await;

    assert_eq!(report.outcome, WorkflowState::CanceledOutcome);
    assert_eq!(report.cancellation, Some(details));
    assert_eq!(
        console.lines(),
        vec![
            "Synthesis started.",
            "Received a cancellation.",
            "CANCELED: Reason=2.",
        ]
    );
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_abandons_outcome() {
    let mut script = Script::new(
        vec![(SynthesisPhase::Started, 0)],
        ScriptedOutcome::Completed(10),
    );
    script.delay = Duration::from_secs(120);
    let (service, counters) = ScriptedService::new(script);
    let console = Console::capture();
    let mut workflow = SynthesisWorkflow::new(service, console.clone());

    let started = tokio::time::Instant::now();
    let report = workflow.run_with(config(), "Hello").await;

    assert_eq!(report.outcome, WorkflowState::TimedOut);
    assert!(started.elapsed() >= Duration::from_secs(30));
    assert!(started.elapsed() < Duration::from_secs(120));
    assert_eq!(
        console.lines(),
        vec!["Synthesis started.", "Speech synthesis timed out"]
    );
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);

    // Let the abandoned synthesis finish: its outcome has nowhere to go
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert!(counters.late_outcome_discarded.load(Ordering::SeqCst));
    assert_eq!(console.lines().len(), 2);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_custom_timeout() {
    let mut script = Script::new(vec![], ScriptedOutcome::Completed(10));
    script.delay = Duration::from_secs(10);
    let (service, _counters) = ScriptedService::new(script);
    let mut workflow =
        SynthesisWorkflow::new(service, Console::capture()).with_timeout(Duration::from_secs(5));

    let report = workflow.run_with(config(), "Hello").await;
    assert_eq!(report.outcome, WorkflowState::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_error_outcome() {
    let script = Script::new(
        vec![(SynthesisPhase::Started, 0)],
        ScriptedOutcome::Error("stream reset".to_string()),
    );
    let (service, counters) = ScriptedService::new(script);
    let console = Console::capture();
    let mut workflow = SynthesisWorkflow::new(service, console.clone());

    let report = workflow.run_with(config(), "Hello").await;

    assert_eq!(report.outcome, WorkflowState::Errored);
    assert_eq!(
        console.lines().last().map(String::as_str),
        Some("Speech synthesis error: Speech synthesis error: stream reset")
    );
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_speak_still_closes() {
    let mut script = Script::new(vec![], ScriptedOutcome::Completed(1));
    script.reject_speak = true;
    let (service, counters) = ScriptedService::new(script);
    let mut workflow = SynthesisWorkflow::new(service, Console::capture());

    let report = workflow.run_with(config(), "Hello").await;

    assert_eq!(report.outcome, WorkflowState::Errored);
    assert_eq!(counters.opens.load(Ordering::SeqCst), 1);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_config_error_opens_nothing() {
    let (service, counters) =
        ScriptedService::new(Script::new(vec![], ScriptedOutcome::Completed(1)));
    let console = Console::capture();
    let mut workflow = SynthesisWorkflow::new(service, console.clone());

    let report = workflow
        .run_with(SpeechConfig::from_subscription("", "eastus"), "Hello")
        .await;

    assert_eq!(report.outcome, WorkflowState::Errored);
    assert!(console.lines()[0].starts_with("Speech config error:"));
    assert_eq!(counters.opens.load(Ordering::SeqCst), 0);
    assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_open_error_closes_nothing() {
    let (mut service, counters) =
        ScriptedService::new(Script::new(vec![], ScriptedOutcome::Completed(1)));
    service.fail_open = true;
    let console = Console::capture();
    let mut workflow = SynthesisWorkflow::new(service, console.clone());

    let report = workflow.run_with(config(), "Hello").await;

    assert_eq!(report.outcome, WorkflowState::Errored);
    assert_eq!(
        console.lines(),
        vec!["Speech synthesizer error: Synthesizer error: cannot reach service"]
    );
    assert_eq!(counters.closes.load(Ordering::SeqCst), 0);
}
