//! Service modules for letter generation

pub mod context_enricher;
pub mod generator;
pub mod interview;
pub mod length_converger;
pub mod letter_cleaner;
pub mod letter_pipeline;
pub mod prompts;

// Re-export service types
pub use context_enricher::{extract_institution_name, extract_program_name, ContextEnricher, GatheredContext};
pub use generator::{QuotaGuardedGenerator, TextGenerator};
pub use interview::{AnswerSource, Respondent};
pub use length_converger::{LengthConverger, LengthOutcome, LetterDraft};
pub use letter_cleaner::clean_letter_text;
pub use letter_pipeline::{LetterPipeline, LetterRequest};
pub use prompts::LetterPrompts;
