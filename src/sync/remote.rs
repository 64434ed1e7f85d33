//! Publishing the document to the remote store.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Remote not configured")]
    NotConfigured,

    #[error("No config")]
    NoConfig,

    #[error("Remote save failed: {0}")]
    Status(u16),

    #[error("Remote save failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Writes whole documents to `PUT <url>`.
///
/// Concurrent publishes are independent requests; the store keeps the last
/// one to arrive.
#[derive(Clone)]
pub struct RemotePublisher {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl RemotePublisher {
    pub fn new(client: reqwest::Client, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client,
            url: url.into(),
            token,
        }
    }

    /// `None` when no remote endpoint is configured.
    pub fn from_config(config: &ClientConfig, client: reqwest::Client) -> Option<Self> {
        let url = config.remote_url.as_deref().filter(|u| !u.is_empty())?;
        Some(Self::new(client, url, config.remote_token.clone()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn publish(&self, doc: &Value) -> Result<(), PublishError> {
        let mut request = self
            .client
            .put(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(doc.to_string());
        if let Some(token) = self.token.as_deref().filter(|t| !t.is_empty()) {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                metrics::record_publish("error");
                tracing::error!(url = %self.url, error = %e, "Publish request failed");
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            metrics::record_publish("rejected");
            tracing::warn!(url = %self.url, status = status.as_u16(), "Publish rejected");
            return Err(PublishError::Status(status.as_u16()));
        }

        metrics::record_publish("ok");
        tracing::info!(url = %self.url, "Document published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_url() {
        let mut config = ClientConfig::default();
        assert!(RemotePublisher::from_config(&config, reqwest::Client::new()).is_none());

        config.remote_url = Some("https://edge.example.com/config".into());
        let publisher = RemotePublisher::from_config(&config, reqwest::Client::new()).unwrap();
        assert_eq!(publisher.url(), "https://edge.example.com/config");
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(PublishError::NotConfigured.to_string(), "Remote not configured");
        assert_eq!(PublishError::Status(401).to_string(), "Remote save failed: 401");
    }
}
