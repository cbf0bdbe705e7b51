//! Key-value blob stores
//!
//! String values under string keys, the shape of browser local storage.
//! The file-backed store keeps every key in one JSON object on disk and
//! rewrites it on each change; there is a single writer per file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;

/// Blob store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Trait for key-value blob backends
pub trait BlobStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a value; missing keys are not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Volatile store, lost on restart
#[derive(Default)]
pub struct MemoryBlobStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ============================================================================
// File store
// ============================================================================

/// Store persisted as a single JSON object file
pub struct FileBlobStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileBlobStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file starts empty. An unreadable or corrupted file also
    /// starts empty and is overwritten on the next write.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!(path = %path.display(), "Blob store file is corrupted, starting empty: {}", e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read blob store file, starting empty: {}", e);
                BTreeMap::new()
            }
        };

        tracing::debug!(path = %path.display(), keys = entries.len(), "Opened blob store");

        Self {
            path,
            entries: RwLock::new(entries),
        }
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        // Write to a sibling file first so a crash never leaves half a blob
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}
