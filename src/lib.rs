//! Site configuration sync.
//!
//! One bilingual JSON document drives the whole site. This crate holds the
//! pieces that load, normalize, edit and publish it, and the small HTTP
//! service that stores it and signs media uploads.

pub mod config;
pub mod document;
pub mod http;
pub mod kv;
pub mod lifecycle;
pub mod media;
pub mod observability;
pub mod security;
pub mod sync;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
