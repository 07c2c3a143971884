//! Gemini client for text generation

use crate::config::GeminiConfig;
use crate::error::{ErrorKind, LetterError, Result};
use crate::services::generator::TextGenerator;
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;

const API_KEY_HEADER: &str = "x-goog-api-key";
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";
const RETRY_INFO_TYPE: &str = "type.googleapis.com/google.rpc.RetryInfo";

pub struct GeminiClient {
    api_key: String,
    endpoint: String,
    http_client: HttpClient,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let endpoint = format!(
            "{}/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model
        );

        Ok(Self {
            api_key: config.api_key.clone(),
            endpoint,
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Turn a non-success response into a generation error.
    ///
    /// Rate limiting is tagged explicitly and a `RetryInfo` hint is rewritten
    /// as `retry_delay { seconds: N }` so the quota manager can honor it.
    fn error_from_response(status: StatusCode, body: &str) -> LetterError {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().map(|v| &v["error"]);

        let message = error
            .and_then(|e| e["message"].as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string());
        let api_status = error.and_then(|e| e["status"].as_str()).unwrap_or_default();

        let mut text = format!("Gemini API returned {}: {}", status.as_u16(), message);
        if let Some(seconds) = error.and_then(retry_delay_seconds) {
            text.push_str(&format!(" retry_delay {{ seconds: {} }}", seconds));
        }

        if status == StatusCode::TOO_MANY_REQUESTS || api_status == RESOURCE_EXHAUSTED {
            LetterError::rate_limited(text)
        } else {
            LetterError::generation(text)
        }
    }

    fn extract_text(result: &Value) -> Result<String> {
        if let Some(reason) = result["promptFeedback"]["blockReason"].as_str() {
            return Err(LetterError::Generation {
                kind: Some(ErrorKind::Permanent),
                message: format!("Prompt blocked by Gemini: {}", reason),
            });
        }

        let parts = result["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| LetterError::generation("No content in Gemini response"))?;

        let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
        if text.trim().is_empty() {
            let reason = result["candidates"][0]["finishReason"]
                .as_str()
                .unwrap_or("unknown");
            return Err(LetterError::Generation {
                kind: Some(ErrorKind::Permanent),
                message: format!("Empty Gemini response (finish reason: {})", reason),
            });
        }

        Ok(text.trim().to_string())
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String> {
        log::debug!("Calling Gemini ({} prompt characters, temperature {})", prompt.chars().count(), temperature);

        let response = self
            .http_client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({
                "contents": [
                    { "parts": [ { "text": prompt } ] }
                ],
                "generationConfig": {
                    "temperature": temperature
                }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = Self::error_from_response(status, &body);
            log::warn!("{}", error);
            return Err(error);
        }

        let result: Value = response.json().await?;
        Self::extract_text(&result)
    }
}

/// Seconds from the `retryDelay` of a `RetryInfo` detail, rounded up
fn retry_delay_seconds(error: &Value) -> Option<u64> {
    error["details"]
        .as_array()?
        .iter()
        .find(|d| d["@type"].as_str() == Some(RETRY_INFO_TYPE))
        .and_then(|d| d["retryDelay"].as_str())
        .and_then(parse_duration_secs)
}

/// Parse a protobuf JSON duration such as `"36s"` or `"1.5s"`
fn parse_duration_secs(value: &str) -> Option<u64> {
    let seconds: f64 = value.trim().strip_suffix('s')?.parse().ok()?;
    (seconds.is_finite() && seconds >= 0.0).then(|| seconds.ceil() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::classifier::parse_retry_delay;

    #[test]
    fn test_parse_duration_secs() {
        assert_eq!(parse_duration_secs("36s"), Some(36));
        assert_eq!(parse_duration_secs("1.2s"), Some(2));
        assert_eq!(parse_duration_secs("36"), None);
        assert_eq!(parse_duration_secs("-1s"), None);
    }

    #[test]
    fn test_rate_limit_error_carries_retry_hint() {
        let body = r#"{
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED",
                "details": [
                    { "@type": "type.googleapis.com/google.rpc.RetryInfo", "retryDelay": "36s" }
                ]
            }
        }"#;

        let error = GeminiClient::error_from_response(StatusCode::TOO_MANY_REQUESTS, body);

        assert_eq!(error.kind_hint(), Some(ErrorKind::Quota));
        assert_eq!(parse_retry_delay(&error.to_string()), Some(36));
        assert!(error.to_string().contains("Gemini API returned 429"));
    }

    #[test]
    fn test_other_errors_are_untagged() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        let error = GeminiClient::error_from_response(StatusCode::BAD_REQUEST, body);

        assert_eq!(error.kind_hint(), None);
        assert!(error.to_string().contains("400: API key not valid."));
    }

    #[test]
    fn test_non_json_error_body_is_kept() {
        let error = GeminiClient::error_from_response(StatusCode::BAD_GATEWAY, "upstream timeout\n");
        assert!(error.to_string().ends_with("502: upstream timeout"));
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let result = json!({
            "candidates": [{
                "content": { "parts": [ { "text": "Madame, " }, { "text": "je souhaite..." } ] },
                "finishReason": "STOP"
            }]
        });
        assert_eq!(GeminiClient::extract_text(&result).unwrap(), "Madame, je souhaite...");
    }

    #[test]
    fn test_blocked_prompt_is_permanent() {
        let result = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        let error = GeminiClient::extract_text(&result).unwrap_err();
        assert_eq!(error.kind_hint(), Some(ErrorKind::Permanent));
        assert!(error.to_string().contains("SAFETY"));
    }
}
