//! Length control for generated letters
//!
//! A draft outside the tolerance band gets exactly one corrective rewrite from
//! the generator. If the rewrite still misses the band, it is truncated or
//! padded to the exact target. Lengths are counted in characters.

use super::generator::TextGenerator;
use super::prompts::LetterPrompts;
use crate::config::ConvergenceConfig;
use crate::constants::PADDING_CHAR;
use crate::error::Result;

/// How the final length of a draft was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthOutcome {
    /// Initial text was already within tolerance
    Accepted,
    /// Corrective rewrite landed within tolerance
    Corrected,
    /// Cut down to the exact target
    Truncated,
    /// Padded up to the exact target
    Padded,
}

/// Letter text with its character count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetterDraft {
    pub text: String,
    pub length: usize,
    pub outcome: LengthOutcome,
}

impl LetterDraft {
    fn new(text: String, outcome: LengthOutcome) -> Self {
        let length = char_len(&text);
        Self { text, length, outcome }
    }
}

pub struct LengthConverger {
    config: ConvergenceConfig,
    prompts: LetterPrompts,
}

impl LengthConverger {
    pub fn new(config: ConvergenceConfig, language: impl Into<String>) -> Self {
        Self {
            prompts: LetterPrompts::new(config.target_length, language),
            config,
        }
    }

    pub fn config(&self) -> ConvergenceConfig {
        self.config
    }

    pub fn within_tolerance(&self, length: usize) -> bool {
        length.abs_diff(self.config.target_length) <= self.config.tolerance
    }

    /// Bring `initial` to the target length, spending at most one generator call
    pub async fn converge<G>(&self, initial: String, generator: &G) -> Result<LetterDraft>
    where
        G: TextGenerator + ?Sized,
    {
        let target = self.config.target_length;
        let initial_length = char_len(&initial);

        if self.within_tolerance(initial_length) {
            log::info!("Letter length {} is close to the target {}", initial_length, target);
            return Ok(LetterDraft::new(initial, LengthOutcome::Accepted));
        }

        let prompt = if initial_length > target {
            log::info!("Letter too long ({} characters), asking for a shorter version", initial_length);
            self.prompts.shorten(&initial, initial_length)
        } else {
            log::info!("Letter too short ({} characters), asking for a longer version", initial_length);
            self.prompts.expand(&initial, initial_length)
        };

        let corrected = generator
            .generate(&prompt, self.config.correction_temperature)
            .await?;
        let corrected_length = char_len(&corrected);
        log::info!("Corrected letter has {} characters", corrected_length);

        if self.within_tolerance(corrected_length) {
            return Ok(LetterDraft::new(corrected, LengthOutcome::Corrected));
        }

        let outcome = if corrected_length > target {
            LengthOutcome::Truncated
        } else {
            LengthOutcome::Padded
        };
        log::warn!(
            "Corrected letter still off target ({} vs {}), forcing length ({:?})",
            corrected_length,
            target,
            outcome
        );
        Ok(LetterDraft::new(force_length(&corrected, target), outcome))
    }
}

/// Character count, not byte count
pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Truncate to, or pad with `.` up to, exactly `target` characters
pub fn force_length(text: &str, target: usize) -> String {
    let length = char_len(text);
    if length >= target {
        text.chars().take(target).collect()
    } else {
        let mut padded = String::with_capacity(text.len() + (target - length));
        padded.push_str(text);
        padded.extend(std::iter::repeat(PADDING_CHAR).take(target - length));
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LetterError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns a fixed reply and records each call
    struct StubGenerator {
        reply: String,
        calls: Mutex<Vec<(String, f32)>>,
    }

    impl StubGenerator {
        fn replying(reply: impl Into<String>) -> Self {
            Self {
                reply: reply.into(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TextGenerator for StubGenerator {
        async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
            self.calls.lock().unwrap().push((prompt.to_string(), temperature));
            Ok(self.reply.clone())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl TextGenerator for FailingGenerator {
        async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String> {
            Err(LetterError::generation("model unavailable"))
        }
    }

    fn converger() -> LengthConverger {
        LengthConverger::new(ConvergenceConfig::default(), "French")
    }

    #[tokio::test]
    async fn test_within_tolerance_is_returned_unchanged() {
        let stub = StubGenerator::replying("unused");
        let initial = "x".repeat(1500);

        let draft = converger().converge(initial.clone(), &stub).await.unwrap();

        assert_eq!(draft.text, initial);
        assert_eq!(draft.length, 1500);
        assert_eq!(draft.outcome, LengthOutcome::Accepted);
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tolerance_band_is_inclusive() {
        let stub = StubGenerator::replying("unused");
        for length in [1460, 1520] {
            let draft = converger().converge("x".repeat(length), &stub).await.unwrap();
            assert_eq!(draft.outcome, LengthOutcome::Accepted);
        }
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn test_short_correction_is_padded() {
        let stub = StubGenerator::replying("y".repeat(1000));

        let draft = converger().converge("x".repeat(1000), &stub).await.unwrap();

        assert_eq!(draft.length, 1490);
        assert_eq!(draft.outcome, LengthOutcome::Padded);
        assert!(draft.text.starts_with(&"y".repeat(1000)));
        assert!(draft.text.ends_with(&".".repeat(490)));
        assert_eq!(stub.call_count(), 1);

        let calls = stub.calls.lock().unwrap();
        assert!(calls[0].0.contains("too short (1000 characters)"));
        assert_eq!(calls[0].1, 0.4);
    }

    #[tokio::test]
    async fn test_long_correction_is_truncated() {
        let stub = StubGenerator::replying("y".repeat(2000));

        let draft = converger().converge("x".repeat(2000), &stub).await.unwrap();

        assert_eq!(draft.text, "y".repeat(1490));
        assert_eq!(draft.outcome, LengthOutcome::Truncated);
        assert_eq!(stub.call_count(), 1);
        assert!(stub.calls.lock().unwrap()[0].0.contains("too long (2000 characters)"));
    }

    #[tokio::test]
    async fn test_successful_correction_is_kept() {
        let stub = StubGenerator::replying("z".repeat(1485));

        let draft = converger().converge("x".repeat(600), &stub).await.unwrap();

        assert_eq!(draft.text, "z".repeat(1485));
        assert_eq!(draft.outcome, LengthOutcome::Corrected);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn test_correction_failure_propagates() {
        let result = converger().converge("x".repeat(10), &FailingGenerator).await;
        assert!(matches!(result, Err(LetterError::Generation { .. })));
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        let accented = "é".repeat(1490);
        assert_eq!(char_len(&accented), 1490);
        assert!(accented.len() > 1490);

        let truncated = force_length(&"à".repeat(2000), 1490);
        assert_eq!(char_len(&truncated), 1490);
        assert!(truncated.chars().all(|c| c == 'à'));
    }

    #[test]
    fn test_force_length_exact_target_is_identity() {
        assert_eq!(force_length("abc", 3), "abc");
        assert_eq!(force_length("", 3), "...");
    }
}
