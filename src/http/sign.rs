//! `POST /cloudinary/sign`.

use axum::{body::Bytes, extract::State, http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::Value;

use crate::http::response::{json_error, json_error_details};
use crate::http::server::AppState;
use crate::media::signature::{sign, unix_now, SignParams, SignedUpload};
use crate::observability::metrics;

pub async fn sign_upload(State(state): State<AppState>, body: Bytes) -> Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            metrics::record_signature("bad_request");
            return json_error_details(StatusCode::BAD_REQUEST, "Bad Request", &e.to_string());
        }
    };

    let config = state.config.load();
    let creds = &config.cloudinary;
    let present = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
    let (Some(api_key), Some(api_secret), Some(cloud_name)) =
        (present(&creds.api_key), present(&creds.api_secret), present(&creds.cloud_name))
    else {
        metrics::record_signature("unconfigured");
        tracing::error!("Signing requested but Cloudinary credentials are not configured");
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Cloudinary env not configured");
    };

    let params = SignParams::from_json(&request, unix_now());
    let signature = sign(&params, &api_secret);
    metrics::record_signature("ok");
    tracing::debug!(timestamp = params.timestamp, folder = ?params.folder, "Signed upload");

    Json(SignedUpload {
        signature,
        timestamp: params.timestamp,
        api_key,
        cloud_name,
    })
    .into_response()
}
