//! Local persistence of the signed-in session.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use super::BackendError;
use crate::auth::Session;
use crate::config::BackendConfig;

/// Where the auth client keeps the current session between runs.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, BackendError>;
    fn save(&self, session: &Session) -> Result<(), BackendError>;
    fn clear(&self) -> Result<(), BackendError>;
}

/// Pick the store described by config: a file when configured, memory otherwise.
#[must_use]
pub fn store_for(config: &BackendConfig) -> Arc<dyn SessionStore> {
    match &config.session_file {
        Some(path) => Arc::new(FileSessionStore::new(path.clone())),
        None => Arc::new(MemorySessionStore::default()),
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Session>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, BackendError> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: &Session) -> Result<(), BackendError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), BackendError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Session persisted as a JSON document on disk.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, BackendError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(BackendError::Store(format!("{}: {e}", self.path.display()))),
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| BackendError::Store(format!("{}: {e}", self.path.display())))
    }

    fn save(&self, session: &Session) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| BackendError::Store(format!("{}: {e}", parent.display())))?;
        }
        let json = serde_json::to_string_pretty(session).map_err(|e| BackendError::Store(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| BackendError::Store(format!("{}: {e}", self.path.display())))
    }

    fn clear(&self) -> Result<(), BackendError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::Store(format!("{}: {e}", self.path.display()))),
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
