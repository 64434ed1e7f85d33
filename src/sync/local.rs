//! Local override storage.
//!
//! The editor keeps its working copy here between sessions. Writes are
//! synchronous and bounded by an optional quota; a quota failure is reported
//! separately so the caller can suggest trimming embedded media or exporting.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use thiserror::Error;

use crate::kv::file::replace_file;

#[derive(Debug, Error)]
pub enum LocalStoreError {
    #[error(
        "local storage quota exceeded ({size} bytes, limit {limit}); \
         remove large embedded images or export the document instead"
    )]
    QuotaExceeded { size: usize, limit: usize },

    #[error("local storage I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl LocalStoreError {
    pub fn is_quota(&self) -> bool {
        matches!(self, LocalStoreError::QuotaExceeded { .. })
    }
}

/// A single durable text slot.
pub trait LocalStore: Send + Sync {
    fn read(&self) -> Result<Option<String>, LocalStoreError>;
    fn write(&self, text: &str) -> Result<(), LocalStoreError>;
}

fn check_quota(quota: Option<usize>, text: &str) -> Result<(), LocalStoreError> {
    match quota {
        Some(limit) if text.len() > limit => Err(LocalStoreError::QuotaExceeded {
            size: text.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// One file on disk, replaced atomically on write.
pub struct FileLocalStore {
    path: PathBuf,
    quota: Option<usize>,
}

impl FileLocalStore {
    pub fn new(path: impl Into<PathBuf>, quota: Option<usize>) -> Self {
        Self {
            path: path.into(),
            quota,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LocalStore for FileLocalStore {
    fn read(&self) -> Result<Option<String>, LocalStoreError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, text: &str) -> Result<(), LocalStoreError> {
        check_quota(self.quota, text)?;
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                parent
            }
            None => Path::new("."),
        };
        replace_file(dir, &self.path, text.as_bytes())?;
        Ok(())
    }
}

/// In-process slot, for tests and embedding.
#[derive(Default)]
pub struct MemoryLocalStore {
    value: Mutex<Option<String>>,
    quota: Option<usize>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            value: Mutex::new(None),
            quota: Some(limit),
        }
    }

    pub fn with_value(text: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(text.into())),
            quota: None,
        }
    }
}

impl LocalStore for MemoryLocalStore {
    fn read(&self) -> Result<Option<String>, LocalStoreError> {
        Ok(self.value.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn write(&self, text: &str) -> Result<(), LocalStoreError> {
        check_quota(self.quota, text)?;
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(text.to_string());
        Ok(())
    }
}

/// Read and parse the stored override. Unreadable or malformed is `None`.
pub fn read_override(store: &dyn LocalStore) -> Option<Value> {
    match store.read() {
        Ok(Some(text)) => match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed local override");
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read local override");
            None
        }
    }
}

/// Serialize `doc` compactly and store it.
pub fn save_document(store: &dyn LocalStore, doc: &Value) -> Result<(), LocalStoreError> {
    let text = serde_json::to_string(doc)?;
    store.write(&text)
}

/// Write `doc` pretty-printed to `path` (the download/export path).
pub fn export_document(doc: &Value, path: &Path) -> Result<(), LocalStoreError> {
    let text = serde_json::to_string_pretty(doc)?;
    fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLocalStore::new(dir.path().join("nested/siteConfig.json"), None);
        assert!(store.read().unwrap().is_none());

        save_document(&store, &json!({ "a": 1 })).unwrap();
        assert_eq!(store.read().unwrap().as_deref(), Some(r#"{"a":1}"#));
        assert_eq!(read_override(&store), Some(json!({ "a": 1 })));
    }

    #[test]
    fn test_concurrent_file_writes_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileLocalStore::new(dir.path().join("siteConfig.json"), None));
        let bodies: Vec<String> = (0..8).map(|i| format!("{{\"n\":\"{}\"}}", "y".repeat(i * 100))).collect();

        let writers: Vec<_> = bodies
            .iter()
            .cloned()
            .map(|body| {
                let store = store.clone();
                std::thread::spawn(move || store.write(&body))
            })
            .collect();
        for writer in writers {
            writer.join().unwrap().unwrap();
        }

        let stored = store.read().unwrap().unwrap();
        assert!(bodies.contains(&stored));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_quota_is_distinguishable() {
        let store = MemoryLocalStore::with_quota(8);
        let err = save_document(&store, &json!({ "image": "data:image/png;base64,AAAA" })).unwrap_err();
        assert!(err.is_quota());
        assert!(store.read().unwrap().is_none());

        let io = LocalStoreError::Io(io::Error::new(io::ErrorKind::PermissionDenied, "denied"));
        assert!(!io.is_quota());
    }

    #[test]
    fn test_malformed_override_is_ignored() {
        let store = MemoryLocalStore::with_value("{not json");
        assert_eq!(read_override(&store), None);
    }

    #[test]
    fn test_export_is_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        export_document(&json!({ "site": { "title": "x" } }), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"site\""));
    }
}
