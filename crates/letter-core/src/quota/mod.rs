//! Quota-aware request execution and usage accounting

pub mod classifier;
pub mod manager;
pub mod timing;
pub mod usage_store;

pub use classifier::{ErrorClassifier, MessageClassifier};
pub use manager::QuotaManager;
pub use timing::{Clock, ManualClock, RecordingSleeper, Sleeper, SystemClock, TokioSleeper};
pub use usage_store::{JsonUsageStore, MemoryUsageStore, UsageStore};
