// src/session/storage.rs

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use super::SessionError;

/// Fixed keys under which an in-progress attempt is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionKey {
    TimerStart,
    TimerRemaining,
    Answers,
    CurrentQuestion,
    Started,
    Paper,
}

impl SessionKey {
    pub const ALL: [SessionKey; 6] = [
        SessionKey::TimerStart,
        SessionKey::TimerRemaining,
        SessionKey::Answers,
        SessionKey::CurrentQuestion,
        SessionKey::Started,
        SessionKey::Paper,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SessionKey::TimerStart => "exam_timer_start",
            SessionKey::TimerRemaining => "exam_timer_remaining",
            SessionKey::Answers => "exam_answers",
            SessionKey::CurrentQuestion => "exam_current_question",
            SessionKey::Started => "exam_started",
            SessionKey::Paper => "exam_paper",
        }
    }
}

/// Durable string storage for session state, in the manner of a browser's
/// local storage.
pub trait SessionStorage: Send {
    fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError>;

    fn set(&mut self, key: SessionKey, value: String) -> Result<(), SessionError>;

    fn remove(&mut self, key: SessionKey) -> Result<(), SessionError>;

    /// Removes every session key.
    fn clear(&mut self) -> Result<(), SessionError> {
        for key in SessionKey::ALL {
            self.remove(key)?;
        }
        Ok(())
    }
}

/// In-memory storage. Clones share one map, so a handle kept outside a
/// session sees exactly what survives a "reload".
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<SessionKey, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: SessionKey) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}

impl SessionStorage for MemoryStorage {
    fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned())
    }

    fn set(&mut self, key: SessionKey, value: String) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, value);
        Ok(())
    }

    fn remove(&mut self, key: SessionKey) -> Result<(), SessionError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&key);
        Ok(())
    }
}

/// Storage backed by a single JSON object on disk, rewritten on every change.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, SessionError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(SessionError::Storage(e.to_string())),
        };

        serde_json::from_slice(&raw).or_else(|e| {
            tracing::warn!("Discarding unreadable session file {}: {}", self.path.display(), e);
            Ok(BTreeMap::new())
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SessionError::Storage(e.to_string()))?;
        }

        let body = serde_json::to_vec_pretty(entries).map_err(|e| SessionError::Storage(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, body).map_err(|e| SessionError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| SessionError::Storage(e.to_string()))
    }
}

impl SessionStorage for FileStorage {
    fn get(&self, key: SessionKey) -> Result<Option<String>, SessionError> {
        Ok(self.read_all()?.remove(key.name()))
    }

    fn set(&mut self, key: SessionKey, value: String) -> Result<(), SessionError> {
        let mut entries = self.read_all()?;
        entries.insert(key.name().to_string(), value);
        self.write_all(&entries)
    }

    fn remove(&mut self, key: SessionKey) -> Result<(), SessionError> {
        let mut entries = self.read_all()?;
        if entries.remove(key.name()).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}
