//! HTTP surface of the document store.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, tower layers)
//!     → request.rs (request id, span)
//!     → middleware/cors.rs (preflight, allow-origin)
//!     → config_store.rs (GET/PUT /config) | sign.rs (POST /cloudinary/sign)
//!     → response.rs (no-cache headers, JSON errors)
//! ```

pub mod config_store;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;
pub mod sign;

pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
