//! Text reports printed by the CLI

use chrono::{DateTime, Duration, Local, Utc};
use letter_core::constants::RECENT_QUOTA_WARNING_HOURS;
use letter_core::QuotaManager;
use letter_types::{SessionSummary, UsageReport};
use std::fmt::Write;

fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_seconds() as f64 / 3600.0
}

/// Usage statistics with advice derived from the age of the last quota error
pub fn usage_report(report: &UsageReport, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\n===== GEMINI API USAGE REPORT =====\n");
    let _ = writeln!(out, "Total requests: {}", report.total_requests);
    let _ = writeln!(out, "Quota errors: {}", report.total_quota_errors);
    let _ = writeln!(out, "\nRecent usage:");
    let _ = writeln!(
        out,
        "- Today: {} requests, {} errors",
        report.today.requests, report.today.errors
    );
    let _ = writeln!(
        out,
        "- Yesterday: {} requests, {} errors",
        report.yesterday.requests, report.yesterday.errors
    );

    match report.last_error {
        Some(last_error) => {
            let hours_since = hours_between(last_error, now);
            let _ = writeln!(out, "\nLast quota error:");
            let _ = writeln!(
                out,
                "- Date: {}",
                last_error.with_timezone(&Local).format("%d/%m/%Y %H:%M:%S")
            );
            let _ = writeln!(out, "- {:.1} hours ago", hours_since);

            if hours_since < RECENT_QUOTA_WARNING_HOURS as f64 {
                let _ = writeln!(
                    out,
                    "\nWARNING: recent quota errors may mean the usage limit has been reached.\n\
                     Google usually enforces limits over 24 hour and 60 second periods."
                );
                if hours_since < 1.0 {
                    let _ = writeln!(
                        out,
                        "\nRECOMMENDATION: wait at least one hour before sending new requests."
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "\nRECOMMENDATION: limit the number of requests over the next few hours."
                    );
                }
            } else {
                let _ = writeln!(
                    out,
                    "\nThe last quota error is more than 24 hours old, no immediate limitation expected."
                );
            }
        }
        None => {
            let _ = writeln!(out, "\nNo quota error recorded so far.");
        }
    }

    let _ = writeln!(out, "\n===== USAGE TIPS =====");
    let _ = writeln!(out, "- Gemini quotas are usually counted over 24 hours and 60 seconds");
    let _ = writeln!(out, "- Space generations several minutes apart to avoid errors");
    let _ = writeln!(out, "- After errors, wait a few hours before trying again\n");

    out
}

/// Warning shown before a generation when a quota error happened recently
pub fn recent_quota_warning(quota: &QuotaManager) -> Option<String> {
    let age = quota.recent_quota_error(Duration::hours(RECENT_QUOTA_WARNING_HOURS))?;
    Some(format!(
        "WARNING: quota errors were detected recently ({:.1} hours ago). Expect delays during generation.",
        age.num_seconds() as f64 / 3600.0
    ))
}

pub fn session_list(sessions: &[SessionSummary]) -> String {
    if sessions.is_empty() {
        return "No saved sessions.\n".to_string();
    }

    let mut out = String::new();
    for (i, session) in sessions.iter().enumerate() {
        let updated = session
            .last_updated
            .map(|t| t.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let _ = writeln!(
            out,
            "{}. {} - Program: {} (updated {}) [{}]",
            i + 1,
            session.username,
            session.program,
            updated,
            session.session_id
        );
    }
    out
}
