//! Key-value storage behind `/config`.
//!
//! # Design Decisions
//! - Values are opaque text; the service never re-serializes a document
//! - Last write wins, no versioning or compare-and-swap
//! - Backends are chosen by `store.backend` in the service configuration

pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};

pub use file::FileKv;
pub use memory::MemoryKv;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key '{0}'")]
    InvalidKey(String),

    #[error("stored value for '{0}' is not UTF-8")]
    Encoding(String),

    #[error("store.path is required for the file backend")]
    MissingPath,
}

/// Minimal text key-value store.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;
    async fn put(&self, key: &str, value: String) -> Result<(), KvError>;
}

/// Build the backend selected by `config`.
pub fn from_config(config: &StoreConfig) -> Result<Arc<dyn KvStore>, KvError> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryKv::new())),
        StoreBackend::File => {
            let dir = config
                .path
                .as_deref()
                .ok_or(KvError::MissingPath)?;
            Ok(Arc::new(FileKv::open(dir)?))
        }
    }
}
