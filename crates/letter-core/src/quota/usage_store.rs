//! Persistence of API usage statistics
//!
//! Persistence is advisory: a failed read yields default statistics and a
//! failed write is logged, neither ever reaches the caller.

use crate::error::{LetterError, Result};
use letter_types::UsageStats;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Storage backend for [`UsageStats`]
pub trait UsageStore: Send + Sync {
    /// Stored statistics, or defaults if absent or unreadable
    fn load(&self) -> UsageStats;

    /// Best-effort write of the statistics
    fn save(&self, stats: &UsageStats);
}

/// Single JSON file, rewritten after every recorded attempt
#[derive(Debug, Clone)]
pub struct JsonUsageStore {
    path: PathBuf,
}

impl JsonUsageStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_stats(&self) -> Result<Option<UsageStats>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| LetterError::Deserialization(format!("Failed to deserialize usage stats: {}", e)))
    }

    /// Write to a sibling temp file, then rename over the target
    fn write_stats(&self, stats: &UsageStats) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(stats)
            .map_err(|e| LetterError::Serialization(format!("Failed to serialize usage stats: {}", e)))?;

        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl UsageStore for JsonUsageStore {
    fn load(&self) -> UsageStats {
        match self.read_stats() {
            Ok(Some(stats)) => {
                log::debug!("Loaded usage stats from {}", self.path.display());
                stats
            }
            Ok(None) => {
                log::debug!("No usage stats at {}, starting fresh", self.path.display());
                UsageStats::default()
            }
            Err(e) => {
                log::warn!("Failed to load usage stats from {}: {}", self.path.display(), e);
                UsageStats::default()
            }
        }
    }

    fn save(&self, stats: &UsageStats) {
        if let Err(e) = self.write_stats(stats) {
            log::warn!("Failed to save usage stats to {}: {}", self.path.display(), e);
        }
    }
}

/// In-memory store, used when persistence is disabled and in tests
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    stats: Mutex<Option<UsageStats>>,
    saves: AtomicUsize,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stats(stats: UsageStats) -> Self {
        Self {
            stats: Mutex::new(Some(stats)),
            saves: AtomicUsize::new(0),
        }
    }

    /// Last saved statistics
    pub fn saved(&self) -> Option<UsageStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl UsageStore for MemoryUsageStore {
    fn load(&self) -> UsageStats {
        self.saved().unwrap_or_default()
    }

    fn save(&self, stats: &UsageStats) {
        *self.stats.lock().unwrap_or_else(PoisonError::into_inner) = Some(stats.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
    }
}
