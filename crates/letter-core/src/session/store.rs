//! File-based store of applicant sessions, one JSON file per session

use crate::error::{LetterError, Result};
use chrono::{DateTime, Local, Utc};
use letter_types::{SessionData, SessionMetadata, SessionSummary};
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_ID_PREFIX: &str = "session_";
const SESSION_ID_FORMAT: &str = "%Y%m%d_%H%M%S";
const SESSION_FILE_EXTENSION: &str = "json";

pub const UNKNOWN_USER: &str = "Unknown user";
pub const UNKNOWN_PROGRAM: &str = "Unknown program";

pub struct SessionStore {
    root_path: PathBuf,
}

impl SessionStore {
    /// Create a store over `root_path`; the directory is created on first save
    pub fn new<P: AsRef<Path>>(root_path: P) -> Self {
        Self {
            root_path: root_path.as_ref().to_path_buf(),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// `session_YYYYMMDD_HHMMSS` for the given local time
    pub fn new_session_id(at: DateTime<Local>) -> String {
        format!("{}{}", SESSION_ID_PREFIX, at.format(SESSION_ID_FORMAT))
    }

    fn session_path(&self, session_id: &str) -> Result<PathBuf> {
        let valid = !session_id.is_empty()
            && session_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(LetterError::Validation(format!("Invalid session id: {:?}", session_id)));
        }
        Ok(self
            .root_path
            .join(format!("{}.{}", session_id, SESSION_FILE_EXTENSION)))
    }

    fn read_session(&self, path: &Path) -> Result<SessionData> {
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map_err(|e| LetterError::Deserialization(format!("Failed to deserialize session: {}", e)))
    }

    /// Save `data`, stamping its metadata. A new id is generated when
    /// `session_id` is `None`. Returns the id used.
    pub fn save(&self, data: &mut SessionData, session_id: Option<&str>) -> Result<String> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => Self::new_session_id(Local::now()),
        };
        let path = self.session_path(&session_id)?;

        data.metadata = Some(SessionMetadata {
            session_id: session_id.clone(),
            last_updated: Utc::now(),
        });

        fs::create_dir_all(&self.root_path)?;
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| LetterError::Serialization(format!("Failed to serialize session: {}", e)))?;
        fs::write(&path, json)?;

        log::info!("Saved session {}", session_id);
        Ok(session_id)
    }

    /// Stored session, or `None` when it is missing or unreadable
    pub fn load(&self, session_id: &str) -> Option<SessionData> {
        let path = match self.session_path(session_id) {
            Ok(path) => path,
            Err(e) => {
                log::warn!("{}", e);
                return None;
            }
        };
        if !path.exists() {
            log::debug!("Session {} not found", session_id);
            return None;
        }

        match self.read_session(&path) {
            Ok(data) => Some(data),
            Err(e) => {
                log::warn!("Failed to load session {}: {}", session_id, e);
                None
            }
        }
    }

    /// Summaries of all readable sessions, most recent id first
    pub fn list(&self) -> Result<Vec<SessionSummary>> {
        if !self.root_path.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in fs::read_dir(&self.root_path)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some(SESSION_FILE_EXTENSION) {
                continue;
            }
            let Some(session_id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };

            match self.read_session(&path) {
                Ok(data) => sessions.push(SessionSummary {
                    username: non_empty_or(&data.personal_info.name, UNKNOWN_USER),
                    program: non_empty_or(&data.program_info.name, UNKNOWN_PROGRAM),
                    last_updated: data.metadata.map(|m| m.last_updated),
                    session_id,
                }),
                Err(e) => log::warn!("Skipping unreadable session file {}: {}", path.display(), e),
            }
        }

        sessions.sort_by(|a, b| b.session_id.cmp(&a.session_id));
        Ok(sessions)
    }

    /// Remove a session; `false` if it did not exist or could not be removed
    pub fn delete(&self, session_id: &str) -> bool {
        let Ok(path) = self.session_path(session_id) else {
            return false;
        };
        if !path.exists() {
            return false;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Deleted session {}", session_id);
                true
            }
            Err(e) => {
                log::warn!("Failed to delete session {}: {}", session_id, e);
                false
            }
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_session_id_format() {
        let at = Local.with_ymd_and_hms(2025, 3, 21, 19, 30, 43).unwrap();
        assert_eq!(SessionStore::new_session_id(at), "session_20250321_193043");
    }

    #[test]
    fn test_rejects_path_like_ids() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        let mut data = SessionData::default();

        assert!(store.save(&mut data, Some("../escape")).is_err());
        assert!(store.load("../escape").is_none());
        assert!(!store.delete("a/b"));
    }
}
