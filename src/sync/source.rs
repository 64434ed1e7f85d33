//! Document sources the loader reads from.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::header::CACHE_CONTROL;
use serde_json::Value;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that yields one whole document.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    async fn fetch(&self) -> Result<Value, SourceError>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// A document served over HTTP, always fetched past any cache.
pub struct HttpSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpSource {
    pub fn new(client: reqwest::Client, url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            client,
            url: Url::parse(url)?,
        })
    }

    /// The URL with a `v=<millis>` query parameter appended.
    pub fn cache_busted_url(&self) -> Url {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let mut url = self.url.clone();
        url.query_pairs_mut().append_pair("v", &millis.to_string());
        url
    }
}

#[async_trait]
impl ConfigSource for HttpSource {
    async fn fetch(&self) -> Result<Value, SourceError> {
        let response = self
            .client
            .get(self.cache_busted_url())
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// A document on the local filesystem (the bundled defaults, usually).
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ConfigSource for FileSource {
    async fn fetch(&self) -> Result<Value, SourceError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&text)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
