//! Configuration management for the letter generator

use crate::constants::*;
use crate::error::{LetterError, Result};
use crate::paths;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix for overrides, e.g. `LETTER__QUOTA__MAX_RETRIES=5`
const ENV_PREFIX: &str = "LETTER";
const ENV_SEPARATOR: &str = "__";

/// Fallback environment variable for the API key
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,

    #[serde(default)]
    pub quota: QuotaConfig,

    #[serde(default)]
    pub letter: LetterSettings,

    #[serde(default)]
    pub scraper: ScraperConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default, alias = "google_api_key")]
    pub api_key: String,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_base_url", alias = "api_url")]
    pub base_url: String,

    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout_secs: default_gemini_timeout(),
        }
    }
}

/// Retry policy of the quota manager
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: f64,
}

impl QuotaConfig {
    /// Base backoff delay. Delays too large for a `Duration` saturate, negative
    /// or NaN ones fall back to the default.
    pub fn initial_delay(&self) -> Duration {
        match Duration::try_from_secs_f64(self.initial_delay_secs) {
            Ok(delay) => delay,
            Err(_) if self.initial_delay_secs > 0.0 => Duration::MAX,
            Err(_) => {
                log::warn!(
                    "Invalid initial retry delay {}s, using {}s",
                    self.initial_delay_secs,
                    DEFAULT_INITIAL_DELAY_SECS
                );
                Duration::from_secs_f64(DEFAULT_INITIAL_DELAY_SECS)
            }
        }
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay_secs: DEFAULT_INITIAL_DELAY_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterSettings {
    #[serde(default = "default_target_length")]
    pub target_length: usize,

    #[serde(default = "default_tolerance")]
    pub tolerance: usize,

    #[serde(default = "default_correction_temperature")]
    pub correction_temperature: f32,

    /// Language the letters are written in
    #[serde(default = "default_language")]
    pub language: String,
}

impl LetterSettings {
    pub fn convergence(&self) -> ConvergenceConfig {
        ConvergenceConfig {
            target_length: self.target_length,
            tolerance: self.tolerance,
            correction_temperature: self.correction_temperature,
        }
    }
}

impl Default for LetterSettings {
    fn default() -> Self {
        Self {
            target_length: DEFAULT_TARGET_LENGTH,
            tolerance: DEFAULT_LENGTH_TOLERANCE,
            correction_temperature: CORRECTION_TEMPERATURE,
            language: default_language(),
        }
    }
}

/// Length control parameters used by the converger
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConvergenceConfig {
    pub target_length: usize,
    pub tolerance: usize,
    pub correction_temperature: f32,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        LetterSettings::default().convergence()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_scraper_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_scraper_attempts")]
    pub max_attempts: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_scraper_timeout(),
            max_attempts: default_scraper_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_usage_file")]
    pub usage_file: PathBuf,

    #[serde(default = "default_sessions_dir")]
    pub sessions_dir: PathBuf,
}

impl StorageConfig {
    /// Usage file resolved against the data root
    pub fn usage_file_path(&self) -> PathBuf {
        paths::resolve(&self.usage_file)
    }

    /// Sessions directory resolved against the data root
    pub fn sessions_dir_path(&self) -> PathBuf {
        paths::resolve(&self.sessions_dir)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            usage_file: default_usage_file(),
            sessions_dir: default_sessions_dir(),
        }
    }
}

// Default functions
fn default_gemini_model() -> String {
    "gemini-pro".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_initial_delay() -> f64 {
    DEFAULT_INITIAL_DELAY_SECS
}

fn default_target_length() -> usize {
    DEFAULT_TARGET_LENGTH
}

fn default_tolerance() -> usize {
    DEFAULT_LENGTH_TOLERANCE
}

fn default_correction_temperature() -> f32 {
    CORRECTION_TEMPERATURE
}

fn default_language() -> String {
    "French".to_string()
}

fn default_scraper_timeout() -> u64 {
    10
}

fn default_scraper_attempts() -> u32 {
    3
}

fn default_usage_file() -> PathBuf {
    PathBuf::from(paths::USAGE_FILE_NAME)
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from(paths::SESSIONS_DIR_NAME)
}

impl LetterConfig {
    /// Load configuration from a JSON file, with `LETTER__*` environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(LetterError::Config(format!(
                "Failed to read config file: {} does not exist",
                path.display()
            )));
        }

        let settings = Config::builder()
            .add_source(File::from(path).format(FileFormat::Json).required(true))
            .add_source(Self::env_source())
            .build()?;

        Self::finish(settings.try_deserialize()?)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Result<Self> {
        let settings = Config::builder().add_source(Self::env_source()).build()?;
        Self::finish(settings.try_deserialize()?)
    }

    /// Load from `path` when it exists, otherwise from the environment
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            log::info!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            log::info!("No config file at {}, using environment", path.display());
            Self::from_env()
        }
    }

    /// Load configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LetterError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn env_source() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    fn finish(mut config: Self) -> Result<Self> {
        if config.gemini.api_key.is_empty() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                config.gemini.api_key = key;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.gemini.api_key.trim().is_empty() {
            return Err(LetterError::Config(format!(
                "Gemini API key is required (set gemini.api_key or {})",
                API_KEY_ENV
            )));
        }

        if self.gemini.model.trim().is_empty() {
            return Err(LetterError::Config("Gemini model name is required".to_string()));
        }

        if !(self.quota.initial_delay_secs > 0.0) || !self.quota.initial_delay_secs.is_finite() {
            return Err(LetterError::Config(
                "Quota initial delay must be a positive number of seconds".to_string(),
            ));
        }

        if self.letter.target_length == 0 || self.letter.tolerance >= self.letter.target_length {
            return Err(LetterError::Config(
                "Letter target length is required and must exceed the tolerance".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.letter.correction_temperature) {
            return Err(LetterError::Config(
                "Correction temperature must be within [0, 2]".to_string(),
            ));
        }

        if self.scraper.max_attempts == 0 {
            return Err(LetterError::Config("Scraper needs at least one attempt".to_string()));
        }

        Ok(())
    }
}
