//! Client modules for external services

pub mod gemini;
pub mod html;
pub mod scraper;

// Re-export all client types
pub use gemini::GeminiClient;
pub use scraper::{PageFetcher, WebScraper};
