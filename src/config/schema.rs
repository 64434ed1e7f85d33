//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge
//! service and the editing client. All types derive Serde traits for
//! deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the site-config service and client.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Key-value store backing `/config`.
    pub store: StoreConfig,

    /// Write authorization for `PUT /config`.
    pub auth: AuthConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Server-side media host credentials used by `/cloudinary/sign`.
    pub cloudinary: CloudinaryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Security hardening.
    pub security: SecurityConfig,

    /// Settings for the editing client (loader, local override, uploads).
    pub client: ClientConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8787").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8787".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout in seconds (edge handlers).
    pub request_secs: u64,

    /// Timeout for outbound fetches made by the client in seconds.
    pub fetch_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            fetch_secs: 10,
        }
    }
}

/// Which key-value backend holds the document.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    File,
}

/// Key-value store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Directory for the file backend.
    pub path: Option<String>,

    /// The single key the document lives under.
    pub key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            path: None,
            key: "siteConfig".to_string(),
        }
    }
}

/// Write authorization.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token required for `PUT /config`. Writes are refused when unset.
    pub admin_token: Option<String>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CorsConfig {
    /// `*` or a comma-separated list of exact origins.
    pub allowed_origins: String,

    /// Host suffixes whose origins are always allowed (e.g. "pages.dev").
    pub trusted_suffixes: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: "*".to_string(),
            trusted_suffixes: Vec::new(),
        }
    }
}

/// Server-side Cloudinary credentials.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CloudinaryConfig {
    pub cloud_name: Option<String>,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 5 * 1024 * 1024, // 5MB, documents may inline images
        }
    }
}

/// Client-side settings: where the loader looks and how the editor saves.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Bundled defaults as a file path.
    pub defaults_path: Option<String>,

    /// Bundled defaults as a URL (takes precedence over the path).
    pub defaults_url: Option<String>,

    /// Remote authoritative endpoint (e.g. "https://edge.example.com/config").
    pub remote_url: Option<String>,

    /// Bearer token sent on publish.
    pub remote_token: Option<String>,

    /// File holding the local override / live-preview copy.
    pub local_path: String,

    /// Storage quota for the local copy in bytes (none = unlimited).
    pub local_quota_bytes: Option<usize>,

    /// Media upload settings.
    pub media: MediaConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            defaults_path: Some("public/config.json".to_string()),
            defaults_url: None,
            remote_url: None,
            remote_token: None,
            local_path: ".site-config/siteConfig.json".to_string(),
            local_quota_bytes: Some(5 * 1024 * 1024),
            media: MediaConfig::default(),
        }
    }
}

/// Client-side media upload fallbacks, overridden by `site.cloudinary` in the document.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct MediaConfig {
    pub cloud_name: Option<String>,
    pub upload_preset: Option<String>,
    pub api_key: Option<String>,
    pub sign_url: Option<String>,
    pub folder: Option<String>,

    /// Base URL of the upload API.
    pub api_base_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            cloud_name: None,
            upload_preset: None,
            api_key: None,
            sign_url: None,
            folder: None,
            api_base_url: "https://api.cloudinary.com/v1_1".to_string(),
        }
    }
}
