//! Error types for the letter generator

use std::fmt;
use thiserror::Error;

/// How a generation failure should be treated by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Upstream rate limiting; worth retrying after a wait
    Quota,
    /// Any other failure; retrying will not help
    Permanent,
}

/// Pipeline stage a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    FormalDraft,
    CreativeDraft,
    Fusion,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::FormalDraft => "formal draft",
            PipelineStage::CreativeDraft => "creative draft",
            PipelineStage::Fusion => "fusion",
        };
        write!(f, "{}", name)
    }
}

/// Main error type for all letter generator operations
#[derive(Error, Debug)]
pub enum LetterError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by the text generation backend.
    /// `kind` is set when the backend adapter knows the failure class.
    #[error("Generation failed: {message}")]
    Generation {
        kind: Option<ErrorKind>,
        message: String,
    },

    #[error("Quota retries exhausted after {attempts} attempts: {last_error}")]
    ExhaustedRetries { attempts: u32, last_error: String },

    #[error("Letter generation failed during {stage}: {message}")]
    Pipeline { stage: PipelineStage, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),
}

impl LetterError {
    /// Untagged generation failure, classified later from its message
    pub fn generation(message: impl Into<String>) -> Self {
        LetterError::Generation {
            kind: None,
            message: message.into(),
        }
    }

    /// Generation failure the adapter already identified as rate limiting
    pub fn rate_limited(message: impl Into<String>) -> Self {
        LetterError::Generation {
            kind: Some(ErrorKind::Quota),
            message: message.into(),
        }
    }

    /// Explicit classification carried by the error, if any
    pub fn kind_hint(&self) -> Option<ErrorKind> {
        match self {
            LetterError::Generation { kind, .. } => *kind,
            LetterError::ExhaustedRetries { .. } => Some(ErrorKind::Quota),
            _ => None,
        }
    }
}

impl From<config::ConfigError> for LetterError {
    fn from(e: config::ConfigError) -> Self {
        LetterError::Config(e.to_string())
    }
}

/// Result type for letter generator operations
pub type Result<T> = std::result::Result<T, LetterError>;
