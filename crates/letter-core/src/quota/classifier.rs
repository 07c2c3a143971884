//! Classification of generation failures into quota and permanent errors

use crate::error::{ErrorKind, LetterError};
use once_cell::sync::Lazy;
use regex::Regex;

/// Message fragments that mark an upstream rate-limit failure
const QUOTA_MARKERS: [&str; 3] = ["429", "quota", "rate limit"];

static RETRY_DELAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)retry_delay\s*\{\s*seconds:\s*(\d+)")
        .expect("Failed to compile retry delay regex")
});

/// Decides whether a failure is worth retrying
pub trait ErrorClassifier: Send + Sync {
    fn classify(&self, error: &LetterError) -> ErrorKind;
}

/// Default classifier.
///
/// Uses the tag set by the backend adapter when there is one and falls back to
/// looking for quota markers in the error text.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageClassifier;

impl ErrorClassifier for MessageClassifier {
    fn classify(&self, error: &LetterError) -> ErrorKind {
        if let Some(kind) = error.kind_hint() {
            return kind;
        }
        if is_quota_message(&error.to_string()) {
            ErrorKind::Quota
        } else {
            ErrorKind::Permanent
        }
    }
}

/// Case-insensitive check for quota markers
pub fn is_quota_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Server-suggested wait in seconds from a `retry_delay { seconds: N }` fragment
pub fn parse_retry_delay(message: &str) -> Option<u64> {
    RETRY_DELAY_RE
        .captures(message)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_markers_are_case_insensitive() {
        assert!(is_quota_message("HTTP 429 Too Many Requests"));
        assert!(is_quota_message("Resource has been exhausted (e.g. check QUOTA)."));
        assert!(is_quota_message("Rate Limit reached for model"));
        assert!(!is_quota_message("Invalid API key"));
        assert!(!is_quota_message("rate-limited"));
    }

    #[test]
    fn test_untagged_errors_use_message() {
        let classifier = MessageClassifier;
        assert_eq!(
            classifier.classify(&LetterError::generation("429 quota exceeded")),
            ErrorKind::Quota
        );
        assert_eq!(
            classifier.classify(&LetterError::generation("safety filter blocked the prompt")),
            ErrorKind::Permanent
        );
        assert_eq!(
            classifier.classify(&LetterError::Validation("rate limit config".to_string())),
            ErrorKind::Quota
        );
    }

    #[test]
    fn test_explicit_tag_wins_over_message() {
        let classifier = MessageClassifier;
        let tagged_quota = LetterError::rate_limited("upstream busy");
        assert_eq!(classifier.classify(&tagged_quota), ErrorKind::Quota);

        let tagged_permanent = LetterError::Generation {
            kind: Some(ErrorKind::Permanent),
            message: "quota field missing in request".to_string(),
        };
        assert_eq!(classifier.classify(&tagged_permanent), ErrorKind::Permanent);
    }

    #[test]
    fn test_parse_retry_delay() {
        let message = "429 Resource exhausted [violations { quota_metric: \"x\" }, retry_delay { seconds: 36 }]";
        assert_eq!(parse_retry_delay(message), Some(36));
        assert_eq!(parse_retry_delay("RETRY_DELAY {seconds:7}"), Some(7));
        assert_eq!(parse_retry_delay("retry_delay { nanos: 5 }"), None);
        assert_eq!(parse_retry_delay("no hint here"), None);
    }
}
