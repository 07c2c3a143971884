/// Path constants and utilities for the letter generator
use std::path::{Path, PathBuf};
use once_cell::sync::OnceCell;

// Static storage for configurable data root
static DATA_ROOT: OnceCell<PathBuf> = OnceCell::new();

// Default root: files live next to where the tool is run
const DEFAULT_DATA_ROOT: &str = ".";

pub const DEFAULT_CONFIG_PATH: &str = "config/letter.json";
pub const USAGE_FILE_NAME: &str = "api_usage_stats.json";
pub const SESSIONS_DIR_NAME: &str = "user_sessions";
pub const LETTER_FILE_EXTENSION: &str = "txt";
pub const DEFAULT_LETTER_FILE_STEM: &str = "motivation_letter";

/// Initialize the data root directory. Can only be called once.
/// If not called, the current directory is used.
pub fn init_data_root<P: Into<PathBuf>>(path: P) -> Result<(), String> {
    DATA_ROOT.set(path.into()).map_err(|_| "Data root already initialized".to_string())
}

/// Get the configured data root or the default
pub fn data_root() -> &'static Path {
    DATA_ROOT
        .get()
        .map(|p| p.as_path())
        .unwrap_or_else(|| Path::new(DEFAULT_DATA_ROOT))
}

/// Resolve a configured path against the data root; absolute paths are kept
pub fn resolve<P: AsRef<Path>>(path: P) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_root().join(path)
    }
}

pub fn usage_stats_path() -> PathBuf {
    resolve(USAGE_FILE_NAME)
}

pub fn sessions_dir() -> PathBuf {
    resolve(SESSIONS_DIR_NAME)
}

/// File name for an exported letter, `.txt` appended when missing
pub fn letter_file_name(requested: &str) -> String {
    let stem = requested.trim();
    let stem = if stem.is_empty() { DEFAULT_LETTER_FILE_STEM } else { stem };
    let suffix = format!(".{}", LETTER_FILE_EXTENSION);
    if stem.ends_with(&suffix) {
        stem.to_string()
    } else {
        format!("{}{}", stem, suffix)
    }
}
