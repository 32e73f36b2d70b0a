//! Configuration management
//!
//! Settings come from `~/.cloudspeak.cfg` (INI, section `[speech]`), with
//! environment variables taking precedence for the credentials and voice.
//! The file is never created automatically since it holds a secret.

use crate::speech::config::{DEFAULT_LANGUAGE, DEFAULT_VOICE};
use crate::speech::{OutputFormat, SpeechConfig};
use crate::{Result, SpeakError};
use ini::Ini;
use log::{debug, info};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SECTION: &str = "speech";

/// Text spoken when nothing else is configured
pub const DEFAULT_TEXT: &str = "Hello, welcome to Azure Speech SDK!";

/// Seconds to wait for a synthesis outcome
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variables and the setting each one overrides
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SPEECH_KEY", "key"),
    ("SPEECH_REGION", "region"),
    ("SPEECH_ENDPOINT", "endpoint"),
    ("SPEECH_VOICE", "voice"),
];

/// Application settings
pub struct Settings {
    /// INI configuration storage
    ini: Ini,

    /// Config file path (~/.cloudspeak.cfg)
    path: PathBuf,

    /// Values from the environment or command line, checked before the file
    overrides: HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default path and apply environment overrides
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(Self::config_path())?;
        settings.apply_env();
        Ok(settings)
    }

    /// Load settings from a specific file; a missing file yields defaults
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading settings from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| SpeakError::IniParse(format!("Failed to load settings: {}", e)))?
        } else {
            info!("Settings file {:?} not found, using defaults", path);
            Ini::new()
        };

        Ok(Self {
            ini,
            path,
            overrides: HashMap::new(),
        })
    }

    /// Save settings to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving settings to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| SpeakError::Config(format!("Failed to save settings: {}", e)))
    }

    /// Get config file path (~/.cloudspeak.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!(".{}.cfg", crate::APP_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn apply_env(&mut self) {
        for (var, key) in ENV_OVERRIDES {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    debug!("Setting '{}' taken from ${}", key, var);
                    self.overrides.insert((*key).to_string(), value);
                }
            }
        }
    }

    /// Override a setting for this run only
    pub fn set_override(&mut self, key: &str, value: &str) {
        self.overrides.insert(key.to_string(), value.to_string());
    }

    /// Set a value in the settings file
    pub fn set(&mut self, key: &str, value: &str) {
        self.ini.with_section(Some(SECTION)).set(key, value);
    }

    fn get(&self, key: &str) -> Option<String> {
        self.overrides
            .get(key)
            .map(String::as_str)
            .or_else(|| self.ini.get_from(Some(SECTION), key))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    pub fn key(&self) -> Option<String> {
        self.get("key")
    }

    pub fn region(&self) -> Option<String> {
        self.get("region")
    }

    pub fn endpoint(&self) -> Option<String> {
        self.get("endpoint")
    }

    pub fn voice(&self) -> String {
        self.get("voice").unwrap_or_else(|| DEFAULT_VOICE.to_string())
    }

    pub fn language(&self) -> String {
        self.get("language").unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
    }

    pub fn output_format(&self) -> OutputFormat {
        self.get("output_format")
            .map(|f| OutputFormat::from_str_or_default(&f))
            .unwrap_or_default()
    }

    /// How long to wait for the outcome; zero or unparsable values use the default
    pub fn timeout(&self) -> Duration {
        let secs = self
            .get("timeout_secs")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&s| s > 0)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    pub fn text(&self) -> String {
        self.get("text").unwrap_or_else(|| DEFAULT_TEXT.to_string())
    }

    /// Build the speech configuration these settings describe
    ///
    /// An explicit endpoint wins over the region.
    pub fn speech_config(&self) -> Result<SpeechConfig> {
        let key = self.key().ok_or_else(|| {
            SpeakError::Config(format!(
                "no subscription key: set SPEECH_KEY or 'key' in {}",
                self.path.display()
            ))
        })?;

        let config = match (self.endpoint(), self.region()) {
            (Some(endpoint), _) => SpeechConfig::from_endpoint(&endpoint, &key)?,
            (None, Some(region)) => SpeechConfig::from_subscription(&key, &region)?,
            (None, None) => {
                return Err(SpeakError::Config(format!(
                    "no region: set SPEECH_REGION or 'region' in {}",
                    self.path.display()
                )))
            }
        };

        Ok(config
            .with_voice_name(self.voice())
            .with_language(self.language())
            .with_output_format(self.output_format()))
    }
}
