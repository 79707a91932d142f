use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

use super::storage::SessionStore;
use crate::config::defaults::default_session_expiry_minutes;
use crate::error::{Result, TurnGateError};
use crate::models::TurnSessionState;

/// Stores each session as `session-<id>.json` in one directory.
pub struct FilesystemSessionStore {
    cache_dir: PathBuf,
    expiry_minutes: i64,
}

impl FilesystemSessionStore {
    /// Store under `~/.cache/turngate`.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            TurnGateError::SessionError("could not determine the home directory".to_string())
        })?;
        Ok(Self::with_dir(home.join(".cache").join("turngate")))
    }

    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            expiry_minutes: default_session_expiry_minutes(),
        }
    }

    pub fn with_expiry_minutes(mut self, minutes: i64) -> Self {
        self.expiry_minutes = minutes;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.cache_dir.join(format!("session-{}.json", session_id))
    }

    fn is_session_file(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "json")
            && path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with("session-"))
    }

    fn read_all(&self) -> Vec<(PathBuf, TurnSessionState)> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| Self::is_session_file(path))
            .filter_map(|path| {
                let content = fs::read_to_string(&path).ok()?;
                match serde_json::from_str::<TurnSessionState>(&content) {
                    Ok(session) => Some((path, session)),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable session file");
                        None
                    }
                }
            })
            .collect()
    }
}

impl SessionStore for FilesystemSessionStore {
    fn find_recent_session(&self) -> Option<TurnSessionState> {
        let now = Local::now();
        let mut sessions = self.read_all();
        sessions.sort_by(|a, b| b.1.last_updated.cmp(&a.1.last_updated));

        let (path, session) = sessions.into_iter().next()?;

        // A turn parked at the confirmation gate stays resumable however old it is
        if session.is_awaiting_confirmation() {
            return Some(session);
        }

        let age_minutes = now
            .signed_duration_since(session.last_updated)
            .num_minutes();
        if age_minutes.abs() < self.expiry_minutes {
            Some(session)
        } else {
            tracing::debug!(session = %session.session_id, age_minutes, "removing expired session");
            let _ = fs::remove_file(path);
            None
        }
    }

    fn load_session(&self, session_id: &str) -> Result<Option<TurnSessionState>> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save_session(&self, session: &TurnSessionState) -> Result<()> {
        fs::create_dir_all(&self.cache_dir)?;
        let content = serde_json::to_string_pretty(session)?;
        fs::write(self.session_path(&session.session_id), content)?;
        Ok(())
    }

    fn clear_all_sessions(&self) -> Result<()> {
        let Ok(entries) = fs::read_dir(&self.cache_dir) else {
            return Ok(());
        };

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if Self::is_session_file(&path) {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
