//! Shared types for the letter generator

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Request counters for a single day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    #[serde(default)]
    pub requests: u64,
    #[serde(default)]
    pub errors: u64,
}

/// Persisted API usage statistics
///
/// `daily_usage` is keyed by `YYYY-MM-DD` so that key order is chronological.
/// The totals are lifetime counters and are not tied to the pruned daily window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub total_requests: u64,

    #[serde(default)]
    pub quota_errors: u64,

    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub last_error_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub daily_usage: BTreeMap<String, DailyUsage>,
}

impl UsageStats {
    /// Counters for a given day key, zero if the day is not tracked
    pub fn day(&self, key: &str) -> DailyUsage {
        self.daily_usage.get(key).copied().unwrap_or_default()
    }
}

/// Accepts RFC 3339 timestamps as well as naive ISO timestamps (read as UTC)
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) => parse_timestamp(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", value))),
    }
}

/// Parse a timestamp written either with or without a UTC offset
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

/// Result of the preventive throttle check. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleDecision {
    pub should_throttle: bool,
    pub delay_seconds: f64,
}

impl ThrottleDecision {
    pub fn none() -> Self {
        Self {
            should_throttle: false,
            delay_seconds: 0.0,
        }
    }

    pub fn wait(delay_seconds: f64) -> Self {
        Self {
            should_throttle: true,
            delay_seconds,
        }
    }
}

/// Usage summary shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub total_requests: u64,
    pub total_quota_errors: u64,
    pub today: DailyUsage,
    pub yesterday: DailyUsage,
    pub last_error: Option<DateTime<Utc>>,
}

/// Personal details collected from the applicant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// One interview question with the applicant's answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewResponse {
    pub question: String,
    pub answer: String,
}

/// Source page of scraped context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
}

/// The three letter variants produced for one request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LetterSet {
    #[serde(default, alias = "letter1")]
    pub formal_letter: String,
    #[serde(default, alias = "letter2")]
    pub creative_letter: String,
    #[serde(default)]
    pub final_letter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub session_id: String,
    pub last_updated: DateTime<Utc>,
}

/// Everything persisted for one applicant session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub personal_info: PersonalInfo,

    #[serde(default)]
    pub program_context: String,

    #[serde(default)]
    pub institution_context: String,

    #[serde(default)]
    pub student_info: String,

    #[serde(default)]
    pub interview_responses: Vec<InterviewResponse>,

    #[serde(default)]
    pub letters: LetterSet,

    #[serde(default)]
    pub program_info: SourceInfo,

    #[serde(default)]
    pub institution_info: SourceInfo,

    #[serde(default)]
    pub metadata: Option<SessionMetadata>,
}

impl SessionData {
    pub fn session_id(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.session_id.as_str())
    }
}

/// Listing entry for a stored session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub username: String,
    pub program: String,
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_usage_stats_defaults_from_empty_object() {
        let stats: UsageStats = serde_json::from_str("{}").unwrap();
        assert_eq!(stats, UsageStats::default());
        assert!(stats.last_error_time.is_none());
        assert!(stats.daily_usage.is_empty());
    }

    #[test]
    fn test_usage_stats_accepts_naive_timestamp_and_extra_fields() {
        let json = r#"{
            "total_requests": 12,
            "quota_errors": 2,
            "last_error_time": "2025-03-21T19:30:43.123456",
            "daily_usage": {"2025-03-21": {"requests": 12, "errors": 2}},
            "hourly_limits": {}
        }"#;

        let stats: UsageStats = serde_json::from_str(json).unwrap();
        assert_eq!(stats.total_requests, 12);
        assert_eq!(stats.quota_errors, 2);
        assert_eq!(stats.day("2025-03-21"), DailyUsage { requests: 12, errors: 2 });
        assert_eq!(stats.day("2025-03-20"), DailyUsage::default());

        let expected = Utc.with_ymd_and_hms(2025, 3, 21, 19, 30, 43).unwrap();
        let parsed = stats.last_error_time.unwrap();
        assert_eq!(parsed.timestamp(), expected.timestamp());
    }

    #[test]
    fn test_usage_stats_rejects_garbage_timestamp() {
        let json = r#"{"last_error_time": "yesterday-ish"}"#;
        assert!(serde_json::from_str::<UsageStats>(json).is_err());
    }

    #[test]
    fn test_session_data_reads_legacy_letter_names() {
        let json = r#"{
            "personal_info": {"name": "Camille Martin"},
            "letters": {"letter1": "formal", "letter2": "creative", "final_letter": "final"}
        }"#;

        let session: SessionData = serde_json::from_str(json).unwrap();
        assert_eq!(session.personal_info.name, "Camille Martin");
        assert_eq!(session.letters.formal_letter, "formal");
        assert_eq!(session.letters.creative_letter, "creative");
        assert_eq!(session.letters.final_letter, "final");
        assert!(session.session_id().is_none());
    }

    #[test]
    fn test_throttle_decision_constructors() {
        assert!(!ThrottleDecision::none().should_throttle);
        assert_eq!(ThrottleDecision::none().delay_seconds, 0.0);
        let wait = ThrottleDecision::wait(12.5);
        assert!(wait.should_throttle);
        assert_eq!(wait.delay_seconds, 12.5);
    }
}
