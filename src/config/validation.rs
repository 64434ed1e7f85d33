//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, paths and sizes
//! - Check that origin lists and suffixes are well-formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{AppConfig, StoreBackend};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("TLS {0} path is empty")]
    TlsPath(&'static str),

    #[error("file store backend requires store.path")]
    StorePath,

    #[error("store.key must not be empty")]
    StoreKey,

    #[error("security.max_body_size must be greater than zero")]
    BodySize,

    #[error("timeouts.{0} must be greater than zero")]
    Timeout(&'static str),

    #[error("invalid allowed origin '{0}'")]
    Origin(String),

    #[error("invalid trusted suffix '{0}'")]
    Suffix(String),

    #[error("invalid client URL '{0}'")]
    ClientUrl(String),
}

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath("certificate"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::TlsPath("key"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(config.observability.metrics_address.clone()));
    }

    if config.store.backend == StoreBackend::File
        && config.store.path.as_deref().map_or(true, |p| p.trim().is_empty())
    {
        errors.push(ValidationError::StorePath);
    }
    if config.store.key.trim().is_empty() {
        errors.push(ValidationError::StoreKey);
    }

    if config.security.max_body_size == 0 {
        errors.push(ValidationError::BodySize);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Timeout("request_secs"));
    }
    if config.timeouts.fetch_secs == 0 {
        errors.push(ValidationError::Timeout("fetch_secs"));
    }

    let origins = config.cors.allowed_origins.trim();
    if origins != "*" {
        for origin in origins.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let valid = Url::parse(origin)
                .map(|u| u.host_str().is_some() && matches!(u.scheme(), "http" | "https"))
                .unwrap_or(false);
            if !valid {
                errors.push(ValidationError::Origin(origin.to_string()));
            }
        }
    }
    for suffix in &config.cors.trusted_suffixes {
        let s = suffix.trim().trim_start_matches('.');
        if s.is_empty() || s.contains('/') || s.contains(':') {
            errors.push(ValidationError::Suffix(suffix.clone()));
        }
    }

    let client_urls = [
        config.client.defaults_url.as_deref(),
        config.client.remote_url.as_deref(),
        config.client.media.sign_url.as_deref(),
        Some(config.client.media.api_base_url.as_str()),
    ];
    for url in client_urls.into_iter().flatten() {
        if Url::parse(url).is_err() {
            errors.push(ValidationError::ClientUrl(url.to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
