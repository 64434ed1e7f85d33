//! Configuration loading from disk and the environment.

use std::path::Path;
use std::fs;
use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load, apply environment overrides to, and validate a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let mut config: AppConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build a configuration from defaults plus the environment only.
pub fn from_env() -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay deployment variables onto `config`. Empty values are ignored.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = get("ADMIN_TOKEN") {
        config.auth.admin_token = Some(token);
    }
    if let Some(origins) = get("ALLOWED_ORIGINS").or_else(|| get("ALLOWED_ORIGIN")) {
        config.cors.allowed_origins = origins;
    }
    if let Some(v) = get("CLOUDINARY_CLOUD_NAME") {
        config.cloudinary.cloud_name = Some(v);
    }
    if let Some(v) = get("CLOUDINARY_API_KEY") {
        config.cloudinary.api_key = Some(v);
    }
    if let Some(v) = get("CLOUDINARY_API_SECRET") {
        config.cloudinary.api_secret = Some(v);
    }
    if let Some(v) = get("CONFIG_ENDPOINT") {
        config.client.remote_url = Some(v);
    }
    if let Some(v) = get("CONFIG_TOKEN") {
        config.client.remote_token = Some(v);
    }
    if let Some(v) = get("SITE_CONFIG_BIND") {
        config.listener.bind_address = v;
    }
}
