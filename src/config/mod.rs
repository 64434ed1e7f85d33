//! Service configuration subsystem.
//!
//! This is the deployment configuration of the edge service and the editing
//! client. The site configuration *document* lives in [`crate::document`].
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, environment overrides)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → shared via ArcSwap with the HTTP handlers
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<AppConfig>
//!     → next request observes new token / CORS / credentials
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Secrets may come from the environment instead of the file

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::AppConfig;
pub use schema::{
    AuthConfig, ClientConfig, CloudinaryConfig, CorsConfig, ListenerConfig, MediaConfig,
    ObservabilityConfig, SecurityConfig, StoreBackend, StoreConfig, TimeoutConfig, TlsConfig,
};
