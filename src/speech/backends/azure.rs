//! Azure Speech text-to-speech backend
//!
//! Talks to the Speech service REST endpoint:
//! `POST https://{region}.tts.speech.microsoft.com/cognitiveservices/v1`
//! with an SSML body, authenticated by the `Ocp-Apim-Subscription-Key` header.
//! The audio comes back as the response body and is reported chunk by chunk
//! as `Progress` events while it streams in.
//!
//! Service-side failures (bad key, throttling, outages) are not errors of the
//! speak call: they resolve the outcome as a cancellation carrying the
//! matching error code, the same way the vendor SDKs report them.

use crate::speech::config::SpeechConfig;
use crate::speech::event::{EventDispatcher, EventHandler, EventSequence, SynthesisPhase};
use crate::speech::result::{CancellationDetails, CancellationErrorCode, SynthesisResult};
use crate::speech::ssml::text_to_ssml;
use crate::speech::synthesizer::{AudioSink, OutcomeSender, SpeakTask, SpeechClient, SpeechService};
use crate::{Result, SpeakError};
use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use log::{debug, info, warn};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OUTPUT_FORMAT_HEADER: &str = "X-Microsoft-OutputFormat";
const SSML_CONTENT_TYPE: &str = "application/ssml+xml";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens [`AzureSynthesizer`] clients
#[derive(Debug, Clone, Default)]
pub struct AzureSpeechService;

impl AzureSpeechService {
    pub fn new() -> Self {
        Self
    }

    /// Open a concrete synthesizer without boxing it
    pub fn open(&self, config: SpeechConfig, sink: Option<AudioSink>) -> Result<AzureSynthesizer> {
        AzureSynthesizer::new(config, sink)
    }
}

impl SpeechService for AzureSpeechService {
    fn open_client(
        &self,
        config: SpeechConfig,
        sink: Option<AudioSink>,
    ) -> Result<Box<dyn SpeechClient>> {
        Ok(Box::new(self.open(config, sink)?))
    }
}

/// Speech synthesizer backed by the Azure REST API
pub struct AzureSynthesizer {
    config: Arc<SpeechConfig>,
    sink: Option<AudioSink>,
    http: reqwest::Client,
    dispatcher: Arc<EventDispatcher>,
    closed: AtomicBool,
    next_request: AtomicU64,
}

impl AzureSynthesizer {
    pub fn new(config: SpeechConfig, sink: Option<AudioSink>) -> Result<Self> {
        debug!("Creating Azure synthesizer for {}", config.endpoint());

        HeaderValue::from_str(config.key().expose()).map_err(|_| {
            SpeakError::Client("subscription key contains characters not allowed in a header".to_string())
        })?;
        if let Some(sink) = &sink {
            sink.attach()?;
            debug!("Audio sink attached: {}", sink.path().display());
        }

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()
            .map_err(|e| SpeakError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            sink,
            http,
            dispatcher: EventDispatcher::new(),
            closed: AtomicBool::new(false),
            next_request: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &SpeechConfig {
        &self.config
    }

    fn start(&self, ssml: String) -> Result<SpeakTask> {
        if self.is_closed() {
            return Err(SpeakError::Speak("synthesizer is closed".to_string()));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            SpeakError::Speak("speak must be called from within a tokio runtime".to_string())
        })?;

        let n = self.next_request.fetch_add(1, Ordering::Relaxed);
        let result_id = format!("{}-{}-{}", crate::APP_NAME, std::process::id(), n);
        let (outcome, task) = SpeakTask::channel(result_id.clone());

        let request = SynthesisRequest {
            http: self.http.clone(),
            config: Arc::clone(&self.config),
            sink: self.sink.clone(),
            ssml,
        };
        let events = self.dispatcher.sequence(result_id.clone());
        debug!("Starting synthesis {}", result_id);
        runtime.spawn(request.run(events, outcome));

        Ok(task)
    }
}

impl SpeechClient for AzureSynthesizer {
    fn subscribe(&self, phase: SynthesisPhase, handler: Arc<dyn EventHandler>) {
        self.dispatcher.subscribe(phase, handler);
    }

    fn speak(&self, text: &str) -> Result<SpeakTask> {
        if text.trim().is_empty() {
            return Err(SpeakError::Speak("nothing to synthesize: text is empty".to_string()));
        }
        let ssml = text_to_ssml(text, self.config.language(), self.config.voice_name())?;
        self.start(ssml)
    }

    fn speak_ssml(&self, ssml: &str) -> Result<SpeakTask> {
        if ssml.trim().is_empty() {
            return Err(SpeakError::Speak("nothing to synthesize: SSML is empty".to_string()));
        }
        self.start(ssml.to_string())
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.dispatcher.close();
        info!("Azure synthesizer closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for AzureSynthesizer {
    fn drop(&mut self) {
        self.close();
    }
}

/// Everything one synthesis needs, moved onto its own task
struct SynthesisRequest {
    http: reqwest::Client,
    config: Arc<SpeechConfig>,
    sink: Option<AudioSink>,
    ssml: String,
}

impl SynthesisRequest {
    async fn run(self, mut events: EventSequence, outcome: OutcomeSender) {
        let result = self.synthesize(&mut events).await;
        if let Err(e) = &result {
            warn!("Synthesis {} failed: {}", events.result_id(), e);
        }
        outcome.resolve(result);
    }

    async fn synthesize(&self, events: &mut EventSequence) -> Result<SynthesisResult> {
        events.emit(SynthesisPhase::Started, 0);

        let response = self
            .http
            .post(self.config.endpoint().clone())
            .header(SUBSCRIPTION_KEY_HEADER, self.config.key().expose())
            .header(CONTENT_TYPE, SSML_CONTENT_TYPE)
            .header(OUTPUT_FORMAT_HEADER, self.config.output_format().as_str())
            .body(self.ssml.clone())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                let details = CancellationDetails::error(
                    CancellationErrorCode::ConnectionFailure,
                    format!("Connection to {} failed: {}", self.config.endpoint(), e),
                );
                return Ok(cancel(events, Bytes::new(), details));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.trim();
            let message = if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                format!("HTTP {}: {}", status, body)
            };
            let details = CancellationDetails::error(
                CancellationErrorCode::from_http_status(status.as_u16()),
                message,
            );
            return Ok(cancel(events, Bytes::new(), details));
        }

        let mut audio = BytesMut::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) if chunk.is_empty() => {}
                Ok(chunk) => {
                    audio.extend_from_slice(&chunk);
                    events.emit(SynthesisPhase::Progress, chunk.len());
                }
                Err(e) => {
                    let details = CancellationDetails::error(
                        CancellationErrorCode::ConnectionFailure,
                        format!("Audio stream interrupted: {}", e),
                    );
                    return Ok(cancel(events, audio.freeze(), details));
                }
            }
        }
        let audio = audio.freeze();

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.write(&audio).await {
                let details = CancellationDetails::error(
                    CancellationErrorCode::RuntimeError,
                    format!("Failed to write audio: {}", e),
                );
                return Ok(cancel(events, audio, details));
            }
        }

        events.emit(SynthesisPhase::Completed, audio.len());
        debug!("Synthesis {} produced {} bytes", events.result_id(), audio.len());
        Ok(SynthesisResult::completed(events.result_id(), audio))
    }
}

fn cancel(events: &mut EventSequence, audio: Bytes, details: CancellationDetails) -> SynthesisResult {
    warn!("Synthesis {} canceled: {}", events.result_id(), details);
    events.emit(SynthesisPhase::Canceled, audio.len());
    SynthesisResult::canceled(events.result_id(), audio, details)
}
