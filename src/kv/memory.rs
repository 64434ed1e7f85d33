//! In-memory backend, shared across clones.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::kv::{KvError, KvStore};

#[derive(Clone, Default)]
pub struct MemoryKv {
    inner: Arc<DashMap<String, String>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), KvError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_last_write_wins() {
        let kv = MemoryKv::new();
        assert_eq!(kv.get("siteConfig").await.unwrap(), None);

        kv.put("siteConfig", "{\"a\":1}".into()).await.unwrap();
        let clone = kv.clone();
        clone.put("siteConfig", "{\"a\":2}".into()).await.unwrap();

        assert_eq!(kv.get("siteConfig").await.unwrap().as_deref(), Some("{\"a\":2}"));
        assert_eq!(kv.len(), 1);
    }
}
