//! Request middleware applied around every route.

pub mod cors;
pub mod metrics;

pub use cors::cors;
pub use metrics::track_metrics;
