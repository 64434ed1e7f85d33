//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin decision; preflight answered or refused)
//!     → auth.rs (bearer token, writes only)
//!     → handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: writes are refused until a token is configured
//! - Reads are public; the document is published site content
//! - No trust in client input

pub mod auth;
pub mod cors;

pub use auth::{authorize_write, WriteDenied};
pub use cors::{CorsPolicy, OriginDecision};
