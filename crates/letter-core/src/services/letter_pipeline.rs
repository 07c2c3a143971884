//! Three-stage letter generation: formal draft, creative draft, fusion

use super::generator::{QuotaGuardedGenerator, TextGenerator};
use super::length_converger::{LengthConverger, LetterDraft};
use super::prompts::LetterPrompts;
use crate::config::LetterSettings;
use crate::constants::{CREATIVE_TEMPERATURE, FORMAL_TEMPERATURE, FUSION_TEMPERATURE};
use crate::error::{LetterError, PipelineStage, Result};
use crate::quota::QuotaManager;
use letter_types::LetterSet;
use std::sync::Arc;

/// Inputs of one letter run
#[derive(Debug, Clone, Default)]
pub struct LetterRequest {
    pub program_context: String,
    pub institution_context: String,
    pub student_profile: String,
}

/// Single orchestration component; every model call goes through the quota manager
pub struct LetterPipeline<G: TextGenerator> {
    generator: QuotaGuardedGenerator<G>,
    converger: LengthConverger,
    prompts: LetterPrompts,
}

impl<G: TextGenerator> LetterPipeline<G> {
    pub fn new(backend: G, quota: Arc<QuotaManager>, settings: &LetterSettings) -> Self {
        Self {
            generator: QuotaGuardedGenerator::new(backend, quota),
            converger: LengthConverger::new(settings.convergence(), settings.language.clone()),
            prompts: LetterPrompts::from_settings(settings),
        }
    }

    /// Produce both drafts and their fusion.
    ///
    /// The first failing stage aborts the run with [`LetterError::Pipeline`];
    /// no partial letters are returned.
    pub async fn run(&self, request: &LetterRequest) -> Result<LetterSet> {
        log::info!("Generating formal draft");
        let formal = self
            .stage(
                PipelineStage::FormalDraft,
                self.prompts.formal(
                    &request.program_context,
                    &request.institution_context,
                    &request.student_profile,
                ),
                FORMAL_TEMPERATURE,
            )
            .await?;

        log::info!("Generating creative draft");
        let creative = self
            .stage(
                PipelineStage::CreativeDraft,
                self.prompts.creative(
                    &request.program_context,
                    &request.institution_context,
                    &request.student_profile,
                ),
                CREATIVE_TEMPERATURE,
            )
            .await?;

        log::info!("Fusing drafts");
        let fused = self
            .stage(
                PipelineStage::Fusion,
                self.prompts.fusion(&formal.text, &creative.text),
                FUSION_TEMPERATURE,
            )
            .await?;

        log::info!(
            "Letter generated: {} characters ({:?})",
            fused.length,
            fused.outcome
        );

        Ok(LetterSet {
            formal_letter: formal.text,
            creative_letter: creative.text,
            final_letter: fused.text,
        })
    }

    async fn stage(&self, stage: PipelineStage, prompt: String, temperature: f32) -> Result<LetterDraft> {
        let result: Result<LetterDraft> = async {
            let draft = self.generator.generate(&prompt, temperature).await?;
            self.converger.converge(draft, &self.generator).await
        }
        .await;

        result.map_err(|e| {
            log::error!("Letter generation failed during {}: {}", stage, e);
            LetterError::Pipeline {
                stage,
                message: e.to_string(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QuotaConfig;
    use crate::quota::{MemoryUsageStore, RecordingSleeper};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Mock backend answering each stage with a fixed-length text
    struct MockGenerator {
        draft_length: usize,
        correction_length: usize,
        should_fail_at_stage: Option<PipelineStage>,
        quota_failures_left: Mutex<u32>,
        prompts: Mutex<Vec<(String, f32)>>,
    }

    impl MockGenerator {
        fn new(draft_length: usize, correction_length: usize) -> Self {
            Self {
                draft_length,
                correction_length,
                should_fail_at_stage: None,
                quota_failures_left: Mutex::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn with_failure_at(mut self, stage: PipelineStage) -> Self {
            self.should_fail_at_stage = Some(stage);
            self
        }

        fn with_quota_failures(self, count: u32) -> Self {
            *self.quota_failures_left.lock().unwrap() = count;
            self
        }

        fn stage_of(prompt: &str) -> Option<PipelineStage> {
            if prompt.starts_with("Write a formal") {
                Some(PipelineStage::FormalDraft)
            } else if prompt.starts_with("Write an engaging") {
                Some(PipelineStage::CreativeDraft)
            } else if prompt.starts_with("Analyze the two versions") {
                Some(PipelineStage::Fusion)
            } else {
                None
            }
        }

        fn temperatures(&self) -> Vec<f32> {
            self.prompts.lock().unwrap().iter().map(|(_, t)| *t).collect()
        }
    }

    #[async_trait]
    impl TextGenerator for MockGenerator {
        async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
            self.prompts.lock().unwrap().push((prompt.to_string(), temperature));

            {
                let mut left = self.quota_failures_left.lock().unwrap();
                if *left > 0 {
                    *left -= 1;
                    return Err(LetterError::generation("429 Resource has been exhausted (quota)"));
                }
            }

            let stage = Self::stage_of(prompt);
            if stage.is_some() && stage == self.should_fail_at_stage {
                return Err(LetterError::generation("prompt blocked by safety filter"));
            }

            Ok(match stage {
                Some(PipelineStage::FormalDraft) => "f".repeat(self.draft_length),
                Some(PipelineStage::CreativeDraft) => "c".repeat(self.draft_length),
                Some(PipelineStage::Fusion) => "u".repeat(self.draft_length),
                None => "r".repeat(self.correction_length),
            })
        }
    }

    fn quota_manager() -> (Arc<QuotaManager>, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::new());
        let manager = QuotaManager::new(Arc::new(MemoryUsageStore::new()), QuotaConfig::default())
            .with_sleeper(sleeper.clone());
        (Arc::new(manager), sleeper)
    }

    fn request() -> LetterRequest {
        LetterRequest {
            program_context: "Program: BUT Informatique".to_string(),
            institution_context: "Institution: IUT Lyon 1".to_string(),
            student_profile: "Question: Why?\nAnswer: Passion".to_string(),
        }
    }

    #[tokio::test]
    async fn test_pipeline_accepts_on_target_drafts() {
        let (quota, _) = quota_manager();
        let backend = Arc::new(MockGenerator::new(1490, 0));
        let pipeline = LetterPipeline::new(backend.clone(), quota.clone(), &LetterSettings::default());

        let letters = pipeline.run(&request()).await.unwrap();

        assert_eq!(letters.formal_letter, "f".repeat(1490));
        assert_eq!(letters.creative_letter, "c".repeat(1490));
        assert_eq!(letters.final_letter, "u".repeat(1490));
        assert_eq!(backend.temperatures(), vec![0.7, 0.9, 0.7]);
        assert_eq!(quota.snapshot().total_requests, 3);
    }

    #[tokio::test]
    async fn test_fusion_prompt_uses_corrected_drafts() {
        let (quota, _) = quota_manager();
        let backend = Arc::new(MockGenerator::new(400, 1480));
        let pipeline = LetterPipeline::new(backend.clone(), quota, &LetterSettings::default());

        let letters = pipeline.run(&request()).await.unwrap();

        // Each stage: one draft call and one correction call
        assert_eq!(backend.temperatures(), vec![0.7, 0.4, 0.9, 0.4, 0.7, 0.4]);
        assert_eq!(letters.formal_letter, "r".repeat(1480));
        assert_eq!(letters.final_letter, "r".repeat(1480));

        let prompts = backend.prompts.lock().unwrap();
        let fusion_prompt = &prompts[4].0;
        assert!(fusion_prompt.contains(&"r".repeat(1480)));
        assert!(!fusion_prompt.contains(&"f".repeat(400)));
    }

    #[tokio::test]
    async fn test_final_letter_length_property() {
        for (draft, correction) in [(1490, 0), (200, 300), (3000, 2500), (100, 1500), (5000, 1470)] {
            let (quota, _) = quota_manager();
            let pipeline = LetterPipeline::new(
                MockGenerator::new(draft, correction),
                quota,
                &LetterSettings::default(),
            );

            let letters = pipeline.run(&request()).await.unwrap();
            let length = letters.final_letter.chars().count();
            assert!(
                (1460..=1520).contains(&length),
                "final length {} for draft {} / correction {}",
                length,
                draft,
                correction
            );
        }
    }

    #[tokio::test]
    async fn test_stage_failure_aborts_with_stage_name() {
        let (quota, _) = quota_manager();
        let backend = Arc::new(MockGenerator::new(1490, 0).with_failure_at(PipelineStage::CreativeDraft));
        let pipeline = LetterPipeline::new(backend.clone(), quota, &LetterSettings::default());

        let error = pipeline.run(&request()).await.unwrap_err();

        match &error {
            LetterError::Pipeline { stage, message } => {
                assert_eq!(*stage, PipelineStage::CreativeDraft);
                assert!(message.contains("safety filter"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(error.to_string().starts_with("Letter generation failed during creative draft"));
        // Fusion was never attempted
        assert_eq!(backend.temperatures(), vec![0.7, 0.9]);
    }

    #[tokio::test]
    async fn test_quota_errors_are_retried_inside_a_stage() {
        let (quota, sleeper) = quota_manager();
        let backend = Arc::new(MockGenerator::new(1490, 0).with_quota_failures(2));
        let pipeline = LetterPipeline::new(backend.clone(), quota.clone(), &LetterSettings::default());

        let letters = pipeline.run(&request()).await.unwrap();

        assert_eq!(letters.final_letter.len(), 1490);
        let stats = quota.snapshot();
        assert_eq!(stats.quota_errors, 2);
        assert_eq!(stats.total_requests, 5);
        // Two backoff waits on the first stage, then a preventive throttle before each later stage
        let waits = sleeper.waits();
        assert_eq!(waits.len(), 4);
        assert_eq!(waits[0].as_secs(), 2);
        assert_eq!(waits[1].as_secs(), 4);
    }

    #[tokio::test]
    async fn test_exhausted_quota_surfaces_as_pipeline_failure() {
        let (quota, _) = quota_manager();
        let backend = MockGenerator::new(1490, 0).with_quota_failures(10);
        let pipeline = LetterPipeline::new(backend, quota, &LetterSettings::default());

        let error = pipeline.run(&request()).await.unwrap_err();

        match error {
            LetterError::Pipeline { stage, message } => {
                assert_eq!(stage, PipelineStage::FormalDraft);
                assert!(message.contains("Quota retries exhausted after 4 attempts"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
