//! Calls the real Gemini API.
//!
//! Run with: GOOGLE_API_KEY=... cargo test --features integration --test test_real_gemini

#![cfg(feature = "integration")]

use letter_core::config::{GeminiConfig, LetterSettings, QuotaConfig, API_KEY_ENV};
use letter_core::quota::MemoryUsageStore;
use letter_core::services::interview;
use letter_core::{GeminiClient, LetterPipeline, LetterRequest, QuotaManager, TextGenerator};
use std::sync::Arc;

fn real_client() -> GeminiClient {
    let api_key = std::env::var(API_KEY_ENV).expect("GOOGLE_API_KEY must be set for integration tests");
    GeminiClient::new(&GeminiConfig {
        api_key,
        ..GeminiConfig::default()
    })
    .expect("Failed to build Gemini client")
}

#[tokio::test]
async fn test_real_generation() {
    let text = real_client()
        .generate("Reply with the single word: bonjour", 0.0)
        .await
        .expect("Gemini call failed");

    println!("Gemini replied: {}", text);
    assert!(!text.is_empty());
}

#[tokio::test]
async fn test_real_letter_respects_length() {
    let settings = LetterSettings::default();
    let quota = Arc::new(QuotaManager::new(Arc::new(MemoryUsageStore::new()), QuotaConfig::default()));
    let pipeline = LetterPipeline::new(real_client(), quota.clone(), &settings);

    let letters = pipeline
        .run(&LetterRequest {
            program_context: "Program: Licence Informatique".to_string(),
            institution_context: "Institution: Université de Bordeaux".to_string(),
            student_profile: interview::student_profile(&interview::conduct(&[], true, &mut NoInput)),
        })
        .await
        .expect("Pipeline failed");

    let length = letters.final_letter.chars().count();
    println!("Final letter: {} characters, {} requests", length, quota.snapshot().total_requests);
    assert!(length.abs_diff(settings.target_length) <= settings.tolerance);
}

struct NoInput;

impl interview::Respondent for NoInput {
    fn ask(&mut self, _question: &str) -> Option<String> {
        None
    }
}
