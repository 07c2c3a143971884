//! Program and institution context: scraped, then enriched by the model

use super::generator::TextGenerator;
use super::prompts::{institution_enrichment, program_enrichment};
use crate::clients::scraper::PageFetcher;
use crate::constants::ENRICHMENT_TEMPERATURE;
use letter_types::SourceInfo;

const PROGRAM_MARKER: &str = "Program:";
const INSTITUTION_MARKER: &str = "Institution:";
pub const UNKNOWN_PROGRAM: &str = "Unknown program";
pub const UNKNOWN_INSTITUTION: &str = "Unknown institution";

/// Context texts ready for the interview and the letter prompts
#[derive(Debug, Clone, PartialEq)]
pub struct GatheredContext {
    pub program_context: String,
    pub institution_context: String,
    pub program_info: SourceInfo,
    pub institution_info: SourceInfo,
}

pub struct ContextEnricher<F, G> {
    fetcher: F,
    generator: G,
}

impl<F: PageFetcher, G: TextGenerator> ContextEnricher<F, G> {
    pub fn new(fetcher: F, generator: G) -> Self {
        Self { fetcher, generator }
    }

    pub async fn program_context(&self, url: &str) -> String {
        let basic = self.fetcher.fetch_program(url).await;
        self.enrich(basic, program_enrichment).await
    }

    pub async fn institution_context(&self, url: &str) -> String {
        let basic = self.fetcher.fetch_institution(url).await;
        self.enrich(basic, institution_enrichment).await
    }

    pub async fn gather(&self, program_url: &str, institution_url: &str) -> GatheredContext {
        log::info!("Gathering program information from {}", program_url);
        let program_context = self.program_context(program_url).await;

        log::info!("Gathering institution information from {}", institution_url);
        let institution_context = self.institution_context(institution_url).await;

        GatheredContext {
            program_info: SourceInfo {
                url: program_url.to_string(),
                name: extract_program_name(&program_context),
            },
            institution_info: SourceInfo {
                url: institution_url.to_string(),
                name: extract_institution_name(&institution_context),
            },
            program_context,
            institution_context,
        }
    }

    /// Append model-enriched notes; on failure keep the scraped text as is
    async fn enrich(&self, basic: String, prompt: fn(&str) -> String) -> String {
        match self.generator.generate(&prompt(&basic), ENRICHMENT_TEMPERATURE).await {
            Ok(enriched) => format!("{}\n\nEnriched information:\n{}", basic, enriched),
            Err(e) => {
                log::warn!("Enrichment failed, using scraped information only: {}", e);
                basic
            }
        }
    }
}

fn value_after_marker(text: &str, marker: &str) -> Option<String> {
    text.lines()
        .filter_map(|line| line.split_once(marker))
        .map(|(_, value)| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn extract_program_name(program_context: &str) -> String {
    value_after_marker(program_context, PROGRAM_MARKER).unwrap_or_else(|| UNKNOWN_PROGRAM.to_string())
}

pub fn extract_institution_name(institution_context: &str) -> String {
    value_after_marker(institution_context, INSTITUTION_MARKER)
        .unwrap_or_else(|| UNKNOWN_INSTITUTION.to_string())
}
