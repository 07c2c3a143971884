//! Web scraper for Parcoursup program pages and institution websites

use super::html::{self, element_texts};
use crate::config::ScraperConfig;
use crate::error::Result;
use crate::quota::{Sleeper, TokioSleeper};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client as HttpClient;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
];

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "fr,fr-FR;q=0.8,en-US;q=0.5,en;q=0.3";
const REFERER: &str = "https://www.google.com/";

/// Below this many characters of page-specific details, a main-content excerpt is appended
const SPECIFIC_DETAILS_MIN_CHARS: usize = 200;
const MAIN_CONTENT_EXCERPT_CHARS: usize = 1000;

pub const PROGRAM_PLACEHOLDER: &str = "Program: (invalid or non-Parcoursup URL, generic data)\n\
\n\
Specific program information could not be extracted.\n\
Provide a valid Parcoursup URL for a more precise letter.\n\
\n\
The letter will be generated from generic information.";

pub const INSTITUTION_PLACEHOLDER: &str = "Institution: (invalid URL, generic data)\n\
\n\
Specific institution information could not be extracted.\n\
Provide a valid institution URL for a more precise letter.\n\
\n\
The letter will be generated from generic information.";

fn class_filter(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Failed to compile class filter regex")
}

fn tags(css: &str) -> Selector {
    Selector::parse(css).expect("Failed to compile tag selector")
}

static PROGRAM_TITLE_CLASS: Lazy<Regex> = Lazy::new(|| class_filter(r"(?i)(title|heading)"));
static ADMISSION_CLASS: Lazy<Regex> = Lazy::new(|| class_filter(r"(?i)(admission|requirements|condition)"));
static SKILLS_CLASS: Lazy<Regex> = Lazy::new(|| class_filter(r"(?i)(skills|competences|attendues)"));
static INSTITUTION_NAME_CLASS: Lazy<Regex> = Lazy::new(|| class_filter(r"(?i)(title|name|logo)"));
static MISSION_CLASS: Lazy<Regex> = Lazy::new(|| class_filter(r"(?i)(about|mission|presentation)"));
static VALUES_CLASS: Lazy<Regex> = Lazy::new(|| class_filter(r"(?i)(values|philosophy|approach)"));

static HEADINGS: Lazy<Selector> = Lazy::new(|| tags("h1, h2"));
static NAME_BLOCKS: Lazy<Selector> = Lazy::new(|| tags("h1, h2, div"));
static BLOCKS: Lazy<Selector> = Lazy::new(|| tags("div, section"));
static SKILL_BLOCKS: Lazy<Selector> = Lazy::new(|| tags("div, section, ul"));
static MISSION_BLOCKS: Lazy<Selector> = Lazy::new(|| tags("div, section, article"));

/// Source of program and institution context. Never fails: unreachable pages
/// and unusable URLs produce explanatory text instead.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_program(&self, url: &str) -> String;
    async fn fetch_institution(&self, url: &str) -> String;
}

pub struct WebScraper {
    http_client: HttpClient,
    max_attempts: u32,
    sleeper: Arc<dyn Sleeper>,
    next_user_agent: AtomicUsize,
}

impl WebScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            max_attempts: config.max_attempts.max(1),
            sleeper: Arc::new(TokioSleeper),
            next_user_agent: AtomicUsize::new(0),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    fn user_agent(&self) -> &'static str {
        let index = self.next_user_agent.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[index % USER_AGENTS.len()]
    }

    /// Page HTML, retried with `2^attempt` second waits; `None` once attempts run out
    pub async fn fetch_html(&self, url: &str) -> Option<String> {
        for attempt in 0..self.max_attempts {
            match self.try_fetch(url).await {
                Ok(body) => return Some(body),
                Err(e) => {
                    log::warn!(
                        "Fetching {} failed (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        self.max_attempts,
                        e
                    );
                    if attempt + 1 < self.max_attempts {
                        let wait = Duration::from_secs(1u64 << attempt.min(16));
                        log::info!("Retrying {} in {}s", url, wait.as_secs());
                        self.sleeper.sleep(wait).await;
                    }
                }
            }
        }

        log::error!("Giving up on {} after {} attempts", url, self.max_attempts);
        None
    }

    async fn try_fetch(&self, url: &str) -> Result<String> {
        let response = self
            .http_client
            .get(url)
            .header("User-Agent", self.user_agent())
            .header("Accept", ACCEPT)
            .header("Accept-Language", ACCEPT_LANGUAGE)
            .header("Referer", REFERER)
            .header("DNT", "1")
            .header("Upgrade-Insecure-Requests", "1")
            .send()
            .await?
            .error_for_status()?;

        Ok(response.text().await?)
    }
}

#[async_trait]
impl PageFetcher for WebScraper {
    async fn fetch_program(&self, url: &str) -> String {
        if url.trim().is_empty() || !url.to_lowercase().contains("parcoursup") {
            log::warn!("Not a Parcoursup URL, using generic program information: {:?}", url);
            return PROGRAM_PLACEHOLDER.to_string();
        }

        match self.fetch_html(url).await {
            Some(page) => {
                let document = Html::parse_document(&page);
                summarize_page(&document, &program_details(&document))
            }
            None => format!(
                "Could not reach the Parcoursup page at {}. Check the URL and try again.",
                url
            ),
        }
    }

    async fn fetch_institution(&self, url: &str) -> String {
        if url.trim().is_empty() {
            log::warn!("No institution URL, using generic institution information");
            return INSTITUTION_PLACEHOLDER.to_string();
        }

        match self.fetch_html(url).await {
            Some(page) => {
                let document = Html::parse_document(&page);
                summarize_page(&document, &institution_details(&document))
            }
            None => format!(
                "Could not reach the institution website at {}. Check the URL and try again.",
                url
            ),
        }
    }
}

fn section(label: &str, texts: &[String]) -> String {
    if texts.is_empty() {
        return String::new();
    }
    let body: String = texts.iter().map(|t| format!("{}\n", t)).collect();
    format!("{}:\n{}\n", label, body)
}

/// `Program:`, admission requirements and expected skills of a Parcoursup page
pub fn program_details(document: &Html) -> String {
    let mut details = String::new();

    if let Some(name) = element_texts(document, &HEADINGS, &PROGRAM_TITLE_CLASS).first() {
        details.push_str(&format!("Program: {}\n\n", name));
    }
    details.push_str(&section(
        "Admission Requirements",
        &element_texts(document, &BLOCKS, &ADMISSION_CLASS),
    ));
    details.push_str(&section(
        "Expected Skills",
        &element_texts(document, &SKILL_BLOCKS, &SKILLS_CLASS),
    ));

    details
}

/// `Institution:`, mission and values of an institution website
pub fn institution_details(document: &Html) -> String {
    let mut details = String::new();

    if let Some(name) = element_texts(document, &NAME_BLOCKS, &INSTITUTION_NAME_CLASS).first() {
        details.push_str(&format!("Institution: {}\n\n", name));
    }
    details.push_str(&section(
        "Mission",
        &element_texts(document, &MISSION_BLOCKS, &MISSION_CLASS),
    ));
    details.push_str(&section(
        "Values and Approach",
        &element_texts(document, &BLOCKS, &VALUES_CLASS),
    ));

    details
}

/// Title, page-specific details (or the meta description when there are none)
/// and a main-content excerpt when the details are thin
pub fn summarize_page(document: &Html, details: &str) -> String {
    let mut summary = format!("Title: {}\n\n", html::extract_title(document));

    if details.is_empty() {
        summary.push_str(&format!("Description: {}\n\n", html::extract_meta_description(document)));
    } else {
        summary.push_str(details);
    }

    if details.chars().count() < SPECIFIC_DETAILS_MIN_CHARS {
        let main_content = html::extract_main_content(document);
        if !main_content.is_empty() {
            let excerpt: String = main_content.chars().take(MAIN_CONTENT_EXCERPT_CHARS).collect();
            summary.push_str(&format!("Additional Information:\n{}...\n", excerpt));
        }
    }

    summary
}
