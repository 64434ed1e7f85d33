//! Directory backend: one file per key, replaced atomically on write.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::kv::{KvError, KvStore};

pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Use `dir` as the store root, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, KvError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        tracing::info!(path = ?dir, "Opened file key-value store");
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, KvError> {
        let valid = !key.is_empty()
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(KvError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KvStore for FileKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| KvError::Encoding(key.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), KvError> {
        let path = self.path_for(key)?;
        let dir = self.dir.clone();
        let bytes = value.len();
        tokio::task::spawn_blocking(move || replace_file(&dir, &path, value.as_bytes()))
            .await
            .map_err(std::io::Error::other)??;
        tracing::debug!(key = key, bytes = bytes, "Stored value");
        Ok(())
    }
}

/// Write into a fresh temp file beside `path`, then rename it over `path`.
/// Concurrent writers never share a temp file; the last rename wins.
pub(crate) fn replace_file(dir: &Path, path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_data()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
