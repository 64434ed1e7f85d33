//! Upload signatures for the media host.
//!
//! The host recomputes the same digest on its side, so the parameter
//! inclusion rules and the sort-join-append-digest order must not change:
//!
//! ```text
//! { folder, public_id, overwrite, timestamp }   (only non-empty ones; timestamp always)
//!     → "key=value" each
//!     → sort lexicographically
//!     → join with '&'
//!     → append api_secret (no separator)
//!     → SHA-1, lowercase hex
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::{Digest, Sha1};

/// Parameters covered by an upload signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignParams {
    pub timestamp: i64,
    pub folder: Option<String>,
    pub public_id: Option<String>,
    pub overwrite: Option<bool>,
}

impl SignParams {
    pub fn new(timestamp: i64) -> Self {
        Self { timestamp, folder: None, public_id: None, overwrite: None }
    }

    /// Read parameters from a request body the way browsers send them.
    ///
    /// - `timestamp`: a non-zero whole number of seconds (number or numeric string), else `now`;
    ///   fractional values are not valid upload timestamps and also fall back to `now`
    /// - `folder` / `public_id`: non-empty strings; other truthy scalars are stringified
    /// - `overwrite`: only real booleans count
    pub fn from_json(body: &Value, now: i64) -> Self {
        let field = |key: &str| body.as_object().and_then(|m| m.get(key));

        let timestamp = field("timestamp").and_then(numeric).filter(|t| *t != 0).unwrap_or(now);
        let overwrite = field("overwrite").and_then(Value::as_bool);

        Self {
            timestamp,
            folder: field("folder").and_then(truthy_text),
            public_id: field("public_id").and_then(truthy_text),
            overwrite,
        }
    }

    /// `key=value` pairs that take part in the signature, sorted.
    pub fn sorted_pairs(&self) -> Vec<String> {
        let mut parts = Vec::with_capacity(4);
        if let Some(folder) = self.folder.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("folder={folder}"));
        }
        if let Some(public_id) = self.public_id.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("public_id={public_id}"));
        }
        if let Some(overwrite) = self.overwrite {
            parts.push(format!("overwrite={overwrite}"));
        }
        parts.push(format!("timestamp={}", self.timestamp));
        parts.sort();
        parts
    }
}

/// The exact byte string that gets digested.
pub fn string_to_sign(params: &SignParams, api_secret: &str) -> String {
    let mut out = params.sorted_pairs().join("&");
    out.push_str(api_secret);
    out
}

/// SHA-1 signature, lowercase hex.
pub fn sign(params: &SignParams, api_secret: &str) -> String {
    let digest = Sha1::digest(string_to_sign(params, api_secret).as_bytes());
    hex::encode(digest)
}

/// Body returned by the signing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedUpload {
    pub signature: String,
    pub timestamp: i64,
    pub api_key: String,
    pub cloud_name: String,
}

/// Current server time in whole seconds.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

fn numeric(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite() && f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn truthy_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}
