//! Speech service configuration
//!
//! A [`SpeechConfig`] carries everything a synthesizer needs to reach the
//! service: the subscription key, the endpoint (derived from the region or
//! given explicitly), and the voice, language and audio format to request.
//! It is immutable; the `with_*` methods consume it and return a new value.

use crate::{Result, SpeakError};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use url::Url;

/// Voice used when none is configured
pub const DEFAULT_VOICE: &str = "en-US-AvaMultilingualNeural";

/// Language used for the SSML `xml:lang` attribute when none is configured
pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Region names are used as a host label, so only plain alphanumerics pass
static REGION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").unwrap());

/// Subscription key for the speech resource
///
/// Never printed: `Debug` shows a redacted placeholder.
#[derive(Clone, PartialEq, Eq)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SubscriptionKey(<redacted>)")
    }
}

/// Audio formats the service can return
///
/// The string form is the value of the `X-Microsoft-OutputFormat` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Audio16Khz32KBitRateMonoMp3,
    Audio24Khz48KBitRateMonoMp3,
    Riff16Khz16BitMonoPcm,
    Riff24Khz16BitMonoPcm,
    Raw16Khz16BitMonoPcm,
    Ogg24Khz16BitMonoOpus,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Audio16Khz32KBitRateMonoMp3 => "audio-16khz-32kbitrate-mono-mp3",
            Self::Audio24Khz48KBitRateMonoMp3 => "audio-24khz-48kbitrate-mono-mp3",
            Self::Riff16Khz16BitMonoPcm => "riff-16khz-16bit-mono-pcm",
            Self::Riff24Khz16BitMonoPcm => "riff-24khz-16bit-mono-pcm",
            Self::Raw16Khz16BitMonoPcm => "raw-16khz-16bit-mono-pcm",
            Self::Ogg24Khz16BitMonoOpus => "ogg-24khz-16bit-mono-opus",
        }
    }

    /// Parse a header value, falling back to the default MP3 format
    pub fn from_str_or_default(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "audio-16khz-32kbitrate-mono-mp3" | "mp3" => Self::Audio16Khz32KBitRateMonoMp3,
            "audio-24khz-48kbitrate-mono-mp3" => Self::Audio24Khz48KBitRateMonoMp3,
            "riff-16khz-16bit-mono-pcm" | "wav" => Self::Riff16Khz16BitMonoPcm,
            "riff-24khz-16bit-mono-pcm" => Self::Riff24Khz16BitMonoPcm,
            "raw-16khz-16bit-mono-pcm" | "pcm" => Self::Raw16Khz16BitMonoPcm,
            "ogg-24khz-16bit-mono-opus" | "opus" => Self::Ogg24Khz16BitMonoOpus,
            _ => Self::default(),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable speech service configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechConfig {
    key: SubscriptionKey,
    region: Option<String>,
    endpoint: Url,
    voice_name: String,
    language: String,
    output_format: OutputFormat,
}

impl SpeechConfig {
    /// Build a configuration from a subscription key and service region
    ///
    /// Only the shape of the inputs is checked here. Whether the key is
    /// accepted for that region is up to the service, which reports a
    /// rejected key as a cancellation.
    pub fn from_subscription(key: &str, region: &str) -> Result<Self> {
        let key = Self::check_key(key)?;
        let region = region.trim();
        if region.is_empty() {
            return Err(SpeakError::Config("region must not be empty".to_string()));
        }
        if !REGION_RE.is_match(region) {
            return Err(SpeakError::Config(format!(
                "invalid region '{}': expected a name like 'eastus'",
                region
            )));
        }

        let region = region.to_lowercase();
        let endpoint = Url::parse(&format!(
            "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
            region
        ))?;
        debug!("Speech config for region {} -> {}", region, endpoint);

        Ok(Self::with_defaults(key, Some(region), endpoint))
    }

    /// Build a configuration for an explicit synthesis endpoint
    pub fn from_endpoint(endpoint: &str, key: &str) -> Result<Self> {
        let key = Self::check_key(key)?;
        let endpoint = Url::parse(endpoint.trim())?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(SpeakError::Config(format!(
                "unsupported endpoint scheme '{}'",
                endpoint.scheme()
            )));
        }
        debug!("Speech config for endpoint {}", endpoint);

        Ok(Self::with_defaults(key, None, endpoint))
    }

    fn check_key(key: &str) -> Result<SubscriptionKey> {
        let key = key.trim();
        if key.is_empty() {
            return Err(SpeakError::Config(
                "subscription key must not be empty".to_string(),
            ));
        }
        Ok(SubscriptionKey::new(key))
    }

    fn with_defaults(key: SubscriptionKey, region: Option<String>, endpoint: Url) -> Self {
        Self {
            key,
            region,
            endpoint,
            voice_name: DEFAULT_VOICE.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            output_format: OutputFormat::default(),
        }
    }

    /// Select the synthesis voice, e.g. `en-US-AvaMultilingualNeural`
    pub fn with_voice_name(mut self, voice_name: impl Into<String>) -> Self {
        self.voice_name = voice_name.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn key(&self) -> &SubscriptionKey {
        &self.key
    }

    /// Region the config was built for; `None` when built from an endpoint
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn voice_name(&self) -> &str {
        &self.voice_name
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }
}
