//! Storage ports for the persisted documents
//!
//! Load/save is injected so a transactional or locked backend can be swapped
//! in without touching store or classifier logic. The default backend is a
//! plain file with whole-document replacement: a failure before the final
//! write leaves the previous state intact.

use std::path::PathBuf;
use thiserror::Error;

/// Persistence failure taxonomy. Corruption is not listed here: unparsable
/// content loads fine as a string and the caller recovers with a default.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unreadable at {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("storage unwritable at {path}: {reason}")]
    Unwritable { path: String, reason: String },
}

/// Injected load/save pair over one persisted document.
pub trait StoragePort {
    /// Returns `None` when the document does not exist yet.
    fn load(&self) -> Result<Option<String>, StorageError>;
    /// Replaces the whole document.
    fn save(&self, contents: &str) -> Result<(), StorageError>;
}

/// File-backed storage. Creates parent directories on first save.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl StoragePort for FileStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        if !self.path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&self.path)
            .map(Some)
            .map_err(|e| StorageError::Unreadable {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Unwritable {
                path: self.path.display().to_string(),
                reason: e.to_string(),
            })?;
        }
        std::fs::write(&self.path, contents).map_err(|e| StorageError::Unwritable {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })
    }
}

/// In-memory storage for tests. Clones share the same backing cell, so a
/// "reopened" store sees what the previous owner saved.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    contents: std::sync::Arc<std::sync::Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn with_contents(contents: &str) -> Self {
        let storage = Self::default();
        *storage.contents.lock().expect("memory storage lock") = Some(contents.to_string());
        storage
    }
}

impl StoragePort for MemoryStorage {
    fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.contents.lock().expect("memory storage lock").clone())
    }

    fn save(&self, contents: &str) -> Result<(), StorageError> {
        *self.contents.lock().expect("memory storage lock") = Some(contents.to_string());
        Ok(())
    }
}
