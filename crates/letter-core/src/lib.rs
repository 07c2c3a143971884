//! Letter Core Library
//!
//! Business logic for the admission letter generator: quota-aware access to
//! the generation backend, length-controlled letter drafting, context
//! gathering and session persistence.

pub mod config;
pub mod clients;
pub mod constants;
pub mod error;
pub mod paths;
pub mod quota;
pub mod services;
pub mod session;

// Re-export main types for easy access
pub use config::LetterConfig;
pub use error::{ErrorKind, LetterError, PipelineStage, Result};

// Re-export client types
pub use clients::{GeminiClient, PageFetcher, WebScraper};

// Re-export quota types
pub use quota::{JsonUsageStore, QuotaManager, UsageStore};

// Re-export service types
pub use services::{
    ContextEnricher,
    LengthConverger,
    LetterPipeline,
    LetterRequest,
    QuotaGuardedGenerator,
    TextGenerator,
};

pub use session::SessionStore;
