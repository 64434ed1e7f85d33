//! Composes the effective document from defaults, remote and local tiers.
//!
//! # Data Flow
//! ```text
//! defaults (file or URL)     failure → {}
//!     → remote (optional)    success replaces wholesale, failure keeps defaults
//!     → local override       admin mode only, deep-merged
//!     → migrate
//! ```

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::document::{deep_merge, migrate};
use crate::sync::local::{read_override, LocalStore};
use crate::sync::source::{ConfigSource, FileSource, HttpSource};

/// Fragment that switches a session into admin mode.
pub const ADMIN_FRAGMENT: &str = "admin";

/// Who the session is for. Only admins see their local override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Visitor,
    Admin,
}

impl Mode {
    /// Admin when the location fragment is `#admin`.
    pub fn from_fragment(fragment: Option<&str>) -> Self {
        match fragment.map(|f| f.trim_start_matches('#')) {
            Some(ADMIN_FRAGMENT) => Mode::Admin,
            _ => Mode::Visitor,
        }
    }
}

#[derive(Default)]
pub struct ConfigLoader {
    defaults: Option<Box<dyn ConfigSource>>,
    remote: Option<Box<dyn ConfigSource>>,
    local: Option<Arc<dyn LocalStore>>,
    mode: Mode,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the client section of the service config.
    ///
    /// A defaults URL wins over a defaults path. Unparseable URLs are logged
    /// and treated as unset.
    pub fn from_config(
        config: &ClientConfig,
        client: reqwest::Client,
        local: Option<Arc<dyn LocalStore>>,
        mode: Mode,
    ) -> Self {
        let mut loader = Self::new().mode(mode);

        if let Some(url) = config.defaults_url.as_deref() {
            match HttpSource::new(client.clone(), url) {
                Ok(source) => loader = loader.with_defaults(source),
                Err(e) => tracing::warn!(url = %url, error = %e, "Ignoring invalid defaults URL"),
            }
        } else if let Some(path) = config.defaults_path.as_deref() {
            loader = loader.with_defaults(FileSource::new(path));
        }

        if let Some(url) = config.remote_url.as_deref() {
            match HttpSource::new(client, url) {
                Ok(source) => loader = loader.with_remote(source),
                Err(e) => tracing::warn!(url = %url, error = %e, "Ignoring invalid remote URL"),
            }
        }

        if let Some(local) = local {
            loader = loader.with_local(local);
        }
        loader
    }

    pub fn with_defaults(mut self, source: impl ConfigSource + 'static) -> Self {
        self.defaults = Some(Box::new(source));
        self
    }

    pub fn with_remote(mut self, source: impl ConfigSource + 'static) -> Self {
        self.remote = Some(Box::new(source));
        self
    }

    pub fn with_local(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local = Some(store);
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Produce the effective, migrated document. Never fails.
    pub async fn load(&self) -> Value {
        let mut doc = match &self.defaults {
            Some(source) => match source.fetch().await {
                Ok(value) => value,
                Err(e) => {
                    tracing::warn!(source = %source.describe(), error = %e, "Defaults unavailable, starting empty");
                    Value::Object(Map::new())
                }
            },
            None => Value::Object(Map::new()),
        };

        if let Some(remote) = &self.remote {
            match remote.fetch().await {
                Ok(value) => {
                    tracing::debug!(source = %remote.describe(), "Using remote document");
                    doc = value;
                }
                Err(e) => {
                    tracing::warn!(source = %remote.describe(), error = %e, "Remote unavailable, keeping defaults");
                }
            }
        }

        if self.mode == Mode::Admin {
            if let Some(overlay) = self.local.as_deref().and_then(read_override) {
                tracing::debug!("Applying local override");
                doc = deep_merge(&doc, &overlay);
            }
        }

        migrate(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::local::MemoryLocalStore;
    use crate::sync::source::SourceError;
    use async_trait::async_trait;
    use serde_json::json;

    struct Fixed(Value);
    struct Failing;

    #[async_trait]
    impl ConfigSource for Fixed {
        async fn fetch(&self) -> Result<Value, SourceError> {
            Ok(self.0.clone())
        }
        fn describe(&self) -> String {
            "fixed".into()
        }
    }

    #[async_trait]
    impl ConfigSource for Failing {
        async fn fetch(&self) -> Result<Value, SourceError> {
            Err(SourceError::Status(503))
        }
        fn describe(&self) -> String {
            "failing".into()
        }
    }

    fn local(value: Value) -> Arc<dyn LocalStore> {
        Arc::new(MemoryLocalStore::with_value(value.to_string()))
    }

    #[test]
    fn test_mode_from_fragment() {
        assert_eq!(Mode::from_fragment(Some("#admin")), Mode::Admin);
        assert_eq!(Mode::from_fragment(Some("admin")), Mode::Admin);
        assert_eq!(Mode::from_fragment(Some("#administrator")), Mode::Visitor);
        assert_eq!(Mode::from_fragment(None), Mode::Visitor);
    }

    #[tokio::test]
    async fn test_no_sources_yields_empty_object() {
        assert_eq!(ConfigLoader::new().load().await, json!({}));
    }

    #[tokio::test]
    async fn test_remote_replaces_defaults_wholesale() {
        let loader = ConfigLoader::new()
            .with_defaults(Fixed(json!({ "theme": { "primary": "#000000" }, "extra": true })))
            .with_remote(Fixed(json!({ "theme": { "primary": "#ffffff" } })));
        let doc = loader.load().await;
        assert_eq!(doc["theme"]["primary"], "#ffffff");
        assert!(doc.get("extra").is_none());
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_defaults() {
        let loader = ConfigLoader::new()
            .with_defaults(Fixed(json!({ "theme": { "primary": "#000000" } })))
            .with_remote(Failing);
        assert_eq!(loader.load().await["theme"]["primary"], "#000000");
    }

    #[tokio::test]
    async fn test_defaults_failure_is_empty() {
        let loader = ConfigLoader::new().with_defaults(Failing);
        assert_eq!(loader.load().await, json!({}));
    }

    #[tokio::test]
    async fn test_local_override_only_in_admin_mode() {
        let base = json!({ "site": { "title": { "en": "Base", "ar": "Base" }, "lang": "en" } });
        let overlay = json!({ "site": { "lang": "ar" } });

        let visitor = ConfigLoader::new()
            .with_defaults(Fixed(base.clone()))
            .with_local(local(overlay.clone()));
        assert_eq!(visitor.load().await["site"]["lang"], "en");

        let admin = ConfigLoader::new()
            .with_defaults(Fixed(base))
            .with_local(local(overlay))
            .mode(Mode::Admin);
        let doc = admin.load().await;
        assert_eq!(doc["site"]["lang"], "ar");
        assert_eq!(doc["site"]["title"]["en"], "Base");
    }

    #[tokio::test]
    async fn test_override_arrays_replace() {
        let loader = ConfigLoader::new()
            .with_defaults(Fixed(json!({ "site": { "nav": [1, 2, 3] } })))
            .with_local(local(json!({ "site": { "nav": [9] } })))
            .mode(Mode::Admin);
        assert_eq!(loader.load().await["site"]["nav"], json!([9]));
    }

    #[tokio::test]
    async fn test_defaults_file_only_is_migrated_as_is() {
        let defaults = json!({ "site": { "title": "A" } });
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), defaults.to_string()).unwrap();

        for mode in [Mode::Visitor, Mode::Admin] {
            let doc = ConfigLoader::new()
                .with_defaults(FileSource::new(file.path()))
                .mode(mode)
                .load()
                .await;
            assert_eq!(doc, migrate(defaults.clone()));
            assert!(doc.pointer("/sections/contact").is_none());
        }
    }

    #[tokio::test]
    async fn test_result_is_migrated() {
        let loader = ConfigLoader::new().with_defaults(Fixed(json!({
            "sections": { "contact": { "hours": ["Sun-Thu", "", { "en": "9-5", "ar": "٩-٥" }] } }
        })));
        let doc = loader.load().await;
        assert_eq!(doc["sections"]["contact"]["hours"], json!({ "en": "Sun-Thu, 9-5", "ar": "Sun-Thu، ٩-٥" }));
        assert_eq!(doc["sections"]["contact"]["subheading"], json!({ "en": "", "ar": "" }));
    }
}
