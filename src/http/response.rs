//! Response helpers shared by the handlers.

use axum::{
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Headers that keep intermediaries from caching the document.
pub fn no_cache_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
        (header::PRAGMA, "no-cache"),
        (header::EXPIRES, "0"),
    ]
}

/// `{ "error": message }` with the given status.
pub fn json_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// `{ "error": message, "details": details }` with the given status.
pub fn json_error_details(status: StatusCode, message: &str, details: &str) -> Response {
    (status, Json(json!({ "error": message, "details": details }))).into_response()
}

pub async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not Found").into_response()
}
