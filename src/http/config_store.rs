//! `GET /config` and `PUT /config`.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::de::IgnoredAny;

use crate::http::response::no_cache_headers;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::security::{authorize_write, WriteDenied};

/// Stored document text, or `{}` when nothing has been written yet.
pub async fn get_config(State(state): State<AppState>) -> Response {
    let key = state.config.load().store.key.clone();
    match state.kv.get(&key).await {
        Ok(value) => (
            StatusCode::OK,
            no_cache_headers(),
            [(header::CONTENT_TYPE, "application/json")],
            value.unwrap_or_else(|| "{}".to_string()),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(key = %key, error = %e, "Failed to read document");
            (StatusCode::INTERNAL_SERVER_ERROR, "Storage error").into_response()
        }
    }
}

/// Replace the stored document with the raw request body.
///
/// Only syntactic JSON validity is checked; the text is stored verbatim.
pub async fn put_config(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let config = state.config.load_full();
    let authorization = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());

    if let Err(denied) = authorize_write(config.auth.admin_token.as_deref(), authorization) {
        metrics::record_write("denied");
        let status = match denied {
            WriteDenied::NotConfigured => StatusCode::FORBIDDEN,
            WriteDenied::BadCredential => StatusCode::UNAUTHORIZED,
        };
        tracing::warn!(reason = %denied, "Rejected document write");
        return (status, denied.to_string()).into_response();
    }

    if serde_json::from_slice::<IgnoredAny>(&body).is_err() {
        metrics::record_write("invalid");
        return (StatusCode::BAD_REQUEST, "Bad Request: invalid JSON").into_response();
    }
    let Ok(text) = String::from_utf8(body.to_vec()) else {
        metrics::record_write("invalid");
        return (StatusCode::BAD_REQUEST, "Bad Request: invalid JSON").into_response();
    };

    let bytes = text.len();
    if let Err(e) = state.kv.put(&config.store.key, text).await {
        metrics::record_write("error");
        tracing::error!(key = %config.store.key, error = %e, "Failed to store document");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Storage error").into_response();
    }

    metrics::record_write("ok");
    tracing::info!(key = %config.store.key, bytes = bytes, "Document stored");
    (StatusCode::OK, no_cache_headers(), "ok").into_response()
}
