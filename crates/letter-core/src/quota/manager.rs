//! Quota-aware request execution
//!
//! Wraps calls to the generation backend with a preventive throttle based on
//! the last quota error, exponential backoff on quota errors, and per-attempt
//! usage accounting persisted through a [`UsageStore`].

use super::classifier::{parse_retry_delay, ErrorClassifier, MessageClassifier};
use super::timing::{Clock, Sleeper, SystemClock, TokioSleeper};
use super::usage_store::UsageStore;
use crate::config::QuotaConfig;
use crate::constants::*;
use crate::error::{ErrorKind, LetterError, Result};
use chrono::{DateTime, Utc};
use letter_types::{DailyUsage, ThrottleDecision, UsageReport, UsageStats};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Per-call retry bookkeeping, dropped when the call ends
#[derive(Debug, Clone, Copy)]
struct RequestAttempt {
    retry_count: u32,
    base_delay: Duration,
}

impl RequestAttempt {
    fn new(base_delay: Duration) -> Self {
        Self {
            retry_count: 0,
            base_delay,
        }
    }

    /// `base_delay * 2^(retry_count - 1)`, saturating at `Duration::MAX`
    fn backoff(&self) -> Duration {
        let exponent = self.retry_count.saturating_sub(1).min(30);
        self.base_delay
            .checked_mul(1 << exponent)
            .unwrap_or(Duration::MAX)
    }
}

enum RetryState<T> {
    Attempting,
    Backoff(Duration),
    Succeeded(T),
    Failed(LetterError),
}

/// Shared request executor; clone the surrounding `Arc` to share it
pub struct QuotaManager {
    stats: Mutex<UsageStats>,
    store: Arc<dyn UsageStore>,
    config: QuotaConfig,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    classifier: Arc<dyn ErrorClassifier>,
}

impl QuotaManager {
    /// Create a manager with the wall clock, tokio sleeping and the default classifier.
    /// Statistics are loaded from `store` once, here.
    pub fn new(store: Arc<dyn UsageStore>, config: QuotaConfig) -> Self {
        let stats = store.load();
        log::debug!(
            "QuotaManager initialized with {} lifetime requests, {} quota errors",
            stats.total_requests,
            stats.quota_errors
        );

        Self {
            stats: Mutex::new(stats),
            store,
            config,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
            classifier: Arc::new(MessageClassifier),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> QuotaConfig {
        self.config
    }

    fn lock_stats(&self) -> MutexGuard<'_, UsageStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current statistics
    pub fn snapshot(&self) -> UsageStats {
        self.lock_stats().clone()
    }

    /// Account for one attempt and persist the result
    pub fn record(&self, success: bool, is_quota_error: bool) {
        let now = self.clock.now();
        let mut stats = self.lock_stats();

        stats.total_requests += 1;
        if is_quota_error {
            stats.quota_errors += 1;
            stats.last_error_time = Some(now);
        }

        let bucket = stats.daily_usage.entry(day_key(now)).or_default();
        bucket.requests += 1;
        if is_quota_error {
            bucket.errors += 1;
        }

        prune_daily_usage(&mut stats.daily_usage, USAGE_HISTORY_DAYS);

        log::debug!(
            "Recorded attempt (success: {}, quota error: {}), {} lifetime requests",
            success,
            is_quota_error,
            stats.total_requests
        );

        self.store.save(&stats);
    }

    /// Preventive throttle derived from the last quota error
    pub fn evaluate_throttle(&self) -> ThrottleDecision {
        let last_error = self.lock_stats().last_error_time;
        throttle_decision(last_error, self.clock.now())
    }

    /// Run `action` with preventive throttling and quota-error retries.
    ///
    /// Non-quota failures are returned unchanged without retrying. A quota
    /// failure on the last permitted attempt becomes
    /// [`LetterError::ExhaustedRetries`].
    pub async fn execute<T, F, Fut>(&self, mut action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let throttle = self.evaluate_throttle();
        if throttle.should_throttle {
            log::warn!(
                "Preventive throttling after a recent quota error, waiting {:.1}s",
                throttle.delay_seconds
            );
            self.sleeper
                .sleep(Duration::try_from_secs_f64(throttle.delay_seconds).unwrap_or_default())
                .await;
        }

        let mut attempt = RequestAttempt::new(self.config.initial_delay());
        let mut state = RetryState::Attempting;

        loop {
            state = match state {
                RetryState::Attempting => {
                    if attempt.retry_count > self.config.max_retries {
                        break;
                    }
                    match action().await {
                        Ok(value) => {
                            self.record(true, false);
                            RetryState::Succeeded(value)
                        }
                        Err(error) => self.on_failure(&mut attempt, error),
                    }
                }
                RetryState::Backoff(wait) => {
                    self.sleeper.sleep(wait).await;
                    RetryState::Attempting
                }
                RetryState::Succeeded(value) => return Ok(value),
                RetryState::Failed(error) => return Err(error),
            };
        }

        Err(LetterError::ExhaustedRetries {
            attempts: attempt.retry_count + 1,
            last_error: "no attempt completed".to_string(),
        })
    }

    fn on_failure<T>(&self, attempt: &mut RequestAttempt, error: LetterError) -> RetryState<T> {
        let is_quota_error = self.classifier.classify(&error) == ErrorKind::Quota;
        self.record(false, is_quota_error);

        if !is_quota_error {
            log::error!("Request failed without quota signal, not retrying: {}", error);
            return RetryState::Failed(error);
        }

        if attempt.retry_count >= self.config.max_retries {
            log::error!(
                "Quota error persisted after {} retries: {}",
                attempt.retry_count,
                error
            );
            return RetryState::Failed(LetterError::ExhaustedRetries {
                attempts: attempt.retry_count + 1,
                last_error: error.to_string(),
            });
        }

        attempt.retry_count += 1;
        let wait = match parse_retry_delay(&error.to_string()) {
            Some(seconds) if seconds > 0 => Duration::from_secs(seconds),
            _ => attempt.backoff(),
        };

        log::warn!(
            "Quota error (retry {}/{}), retrying in {:.1}s",
            attempt.retry_count,
            self.config.max_retries,
            wait.as_secs_f64()
        );
        RetryState::Backoff(wait)
    }

    /// Totals plus today's and yesterday's counters
    pub fn usage_report(&self) -> UsageReport {
        let now = self.clock.now();
        let today = day_key(now);
        let yesterday = day_key(now - chrono::Duration::days(1));

        let stats = self.lock_stats();
        UsageReport {
            total_requests: stats.total_requests,
            total_quota_errors: stats.quota_errors,
            today: stats.day(&today),
            yesterday: stats.day(&yesterday),
            last_error: stats.last_error_time,
        }
    }

    /// Age of the last quota error if it is younger than `window`
    pub fn recent_quota_error(&self, window: chrono::Duration) -> Option<chrono::Duration> {
        let last_error = self.lock_stats().last_error_time?;
        let age = self.clock.now() - last_error;
        (age < window).then_some(age)
    }

    /// Forget all statistics and persist the empty state
    pub fn reset(&self) {
        let mut stats = self.lock_stats();
        *stats = UsageStats::default();
        self.store.save(&stats);
        log::info!("Usage statistics reset");
    }
}

/// `YYYY-MM-DD` key of the UTC day containing `at`
pub fn day_key(at: DateTime<Utc>) -> String {
    at.format(USAGE_DAY_FORMAT).to_string()
}

/// Keep only the `keep` lexicographically largest (most recent) days
pub fn prune_daily_usage(daily_usage: &mut BTreeMap<String, DailyUsage>, keep: usize) {
    while daily_usage.len() > keep {
        daily_usage.pop_first();
    }
}

/// Linear decay from 60 s right after a quota error down to 1 s at the end of
/// the one-hour window; no throttling outside the window.
pub fn throttle_decision(last_error: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ThrottleDecision {
    let Some(last_error) = last_error else {
        return ThrottleDecision::none();
    };

    // A last error in the future (clock skew) counts as "just now"
    let elapsed = ((now - last_error).num_milliseconds() as f64 / 1000.0).max(0.0);
    if elapsed >= THROTTLE_WINDOW_SECS {
        return ThrottleDecision::none();
    }

    let delay = THROTTLE_MAX_DELAY_SECS * (1.0 - elapsed / THROTTLE_WINDOW_SECS);
    ThrottleDecision::wait(delay.max(THROTTLE_MIN_DELAY_SECS))
}
