//! Direct-to-host media uploads from the editor.
//!
//! Settings come from `site.cloudinary` in the document, falling back to the
//! client configuration. A sign URL selects the signed flow; otherwise a
//! cloud name plus upload preset selects the unsigned flow.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::config::MediaConfig;
use crate::media::signature::{unix_now, SignedUpload};

pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 2 * 1024 * 1024;
pub const DEFAULT_MAX_VIDEO_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_FOLDER: &str = "uploads";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        if essence.starts_with("image/") {
            Some(MediaKind::Image)
        } else if essence.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }

    /// Guess a content type from a file extension.
    pub fn guess_content_type(file_name: &str) -> Option<&'static str> {
        let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
        Some(match ext.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "svg" => "image/svg+xml",
            "mp4" => "video/mp4",
            "webm" => "video/webm",
            "mov" => "video/quicktime",
            _ => return None,
        })
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("unsupported file type '{0}'")]
    UnsupportedType(String),

    #[error("{kind:?} is {size} bytes, limit is {limit} bytes")]
    TooLarge { kind: MediaKind, size: u64, limit: u64 },

    #[error("uploads are not configured: set cloud_name and upload_preset, or sign_url")]
    NotConfigured,

    #[error("signing failed: {0}")]
    Sign(String),

    #[error("upload failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Effective upload settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub cloud_name: Option<String>,
    pub upload_preset: Option<String>,
    pub api_key: Option<String>,
    pub sign_url: Option<String>,
    pub folder: String,
    pub max_image_bytes: u64,
    pub max_video_bytes: u64,
    pub api_base_url: String,
}

impl UploadSettings {
    /// Document values (`site.cloudinary.*`) first, then `fallback`.
    pub fn resolve(doc: &Value, fallback: &MediaConfig) -> Self {
        let cloud = doc.pointer("/site/cloudinary");
        let text = |key: &str, fb: &Option<String>| {
            cloud
                .and_then(|c| c.get(key))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .or_else(|| fb.clone().filter(|s| !s.is_empty()))
        };
        let limit = |key: &str, default: u64| {
            cloud
                .and_then(|c| c.get(key))
                .and_then(Value::as_u64)
                .filter(|n| *n > 0)
                .unwrap_or(default)
        };

        Self {
            cloud_name: text("cloud_name", &fallback.cloud_name),
            upload_preset: text("upload_preset", &fallback.upload_preset),
            api_key: text("api_key", &fallback.api_key),
            sign_url: text("sign_url", &fallback.sign_url),
            folder: text("folder", &fallback.folder).unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            max_image_bytes: limit("max_image_bytes", DEFAULT_MAX_IMAGE_BYTES),
            max_video_bytes: limit("max_video_bytes", DEFAULT_MAX_VIDEO_BYTES),
            api_base_url: fallback.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check type and size before any network traffic.
    pub fn validate(&self, file: &MediaFile) -> Result<MediaKind, UploadError> {
        let kind = MediaKind::from_content_type(&file.content_type)
            .ok_or_else(|| UploadError::UnsupportedType(file.content_type.clone()))?;
        let limit = match kind {
            MediaKind::Image => self.max_image_bytes,
            MediaKind::Video => self.max_video_bytes,
        };
        let size = file.bytes.len() as u64;
        if size > limit {
            return Err(UploadError::TooLarge { kind, size, limit });
        }
        Ok(kind)
    }

    fn upload_url(&self, cloud_name: &str) -> String {
        format!("{}/{}/auto/upload", self.api_base_url, cloud_name)
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
    url: Option<String>,
}

/// Uploads files straight to the media host.
#[derive(Clone)]
pub struct Uploader {
    client: reqwest::Client,
    settings: UploadSettings,
}

impl Uploader {
    pub fn new(client: reqwest::Client, settings: UploadSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &UploadSettings {
        &self.settings
    }

    /// Validate and upload `file`, returning its hosted URL.
    pub async fn upload(&self, file: MediaFile) -> Result<String, UploadError> {
        let kind = self.settings.validate(&file)?;
        tracing::debug!(file = %file.file_name, kind = ?kind, size = file.bytes.len(), "Uploading media");

        if let Some(sign_url) = &self.settings.sign_url {
            self.upload_signed(sign_url, file).await
        } else if let (Some(cloud), Some(preset)) = (&self.settings.cloud_name, &self.settings.upload_preset) {
            self.upload_unsigned(cloud, preset, file).await
        } else {
            Err(UploadError::NotConfigured)
        }
    }

    async fn upload_unsigned(&self, cloud: &str, preset: &str, file: MediaFile) -> Result<String, UploadError> {
        let mut form = Form::new()
            .part("file", file_part(file)?)
            .text("upload_preset", preset.to_string());
        if !self.settings.folder.is_empty() {
            form = form.text("folder", self.settings.folder.clone());
        }
        self.send(&self.settings.upload_url(cloud), form).await
    }

    async fn upload_signed(&self, sign_url: &str, file: MediaFile) -> Result<String, UploadError> {
        let timestamp = unix_now();
        let res = self
            .client
            .post(sign_url)
            .json(&json!({ "timestamp": timestamp, "folder": self.settings.folder }))
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status();
            let detail = res.text().await.unwrap_or_default();
            return Err(UploadError::Sign(if detail.is_empty() { status.to_string() } else { detail }));
        }
        let signed: SignedUpload = res.json().await?;

        let cloud = Some(signed.cloud_name.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| self.settings.cloud_name.clone())
            .ok_or(UploadError::NotConfigured)?;
        let api_key = Some(signed.api_key.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| self.settings.api_key.clone())
            .unwrap_or_default();

        let mut form = Form::new()
            .part("file", file_part(file)?)
            .text("timestamp", signed.timestamp.to_string())
            .text("api_key", api_key);
        if !self.settings.folder.is_empty() {
            form = form.text("folder", self.settings.folder.clone());
        }
        form = form.text("signature", signed.signature);

        self.send(&self.settings.upload_url(&cloud), form).await
    }

    async fn send(&self, url: &str, form: Form) -> Result<String, UploadError> {
        let res = self.client.post(url).multipart(form).send().await?;
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(UploadError::Upload(error_detail(&body).unwrap_or_else(|| status.to_string())));
        }
        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|e| UploadError::Upload(e.to_string()))?;
        parsed
            .secure_url
            .or(parsed.url)
            .ok_or_else(|| UploadError::Upload("response carried no URL".into()))
    }
}

fn file_part(file: MediaFile) -> Result<Part, UploadError> {
    Ok(Part::bytes(file.bytes)
        .file_name(file.file_name)
        .mime_str(&file.content_type)?)
}

/// `error.message` from a JSON error body, or the raw text.
fn error_detail(body: &str) -> Option<String> {
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(v) => Some(
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| v.to_string()),
        ),
        Err(_) => Some(body.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(content_type: &str, size: usize) -> MediaFile {
        MediaFile {
            file_name: "f.bin".into(),
            content_type: content_type.into(),
            bytes: vec![0; size],
        }
    }

    #[test]
    fn test_document_settings_override_config() {
        let fallback = MediaConfig {
            cloud_name: Some("from-config".into()),
            upload_preset: Some("preset".into()),
            folder: None,
            ..MediaConfig::default()
        };
        let doc = json!({ "site": { "cloudinary": { "cloud_name": "from-doc", "max_image_bytes": 10, "api_key": "" } } });

        let settings = UploadSettings::resolve(&doc, &fallback);
        assert_eq!(settings.cloud_name.as_deref(), Some("from-doc"));
        assert_eq!(settings.upload_preset.as_deref(), Some("preset"));
        assert_eq!(settings.api_key, None);
        assert_eq!(settings.folder, "uploads");
        assert_eq!(settings.max_image_bytes, 10);
        assert_eq!(settings.max_video_bytes, DEFAULT_MAX_VIDEO_BYTES);
    }

    #[test]
    fn test_validation_by_kind_and_size() {
        let settings = UploadSettings::resolve(&json!({}), &MediaConfig::default());
        assert_eq!(settings.validate(&file("image/png", 1024)).unwrap(), MediaKind::Image);
        assert_eq!(settings.validate(&file("video/mp4; codecs=avc1", 3 * 1024 * 1024)).unwrap(), MediaKind::Video);
        assert!(matches!(
            settings.validate(&file("image/jpeg", 3 * 1024 * 1024)),
            Err(UploadError::TooLarge { kind: MediaKind::Image, .. })
        ));
        assert!(matches!(settings.validate(&file("application/pdf", 1)), Err(UploadError::UnsupportedType(_))));
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(MediaKind::guess_content_type("a/b/photo.JPG"), Some("image/jpeg"));
        assert_eq!(MediaKind::guess_content_type("clip.mov"), Some("video/quicktime"));
        assert_eq!(MediaKind::guess_content_type("notes"), None);
    }

    #[tokio::test]
    async fn test_unconfigured_upload_fails_before_network() {
        let settings = UploadSettings::resolve(&json!({}), &MediaConfig::default());
        let uploader = Uploader::new(reqwest::Client::new(), settings);
        assert!(matches!(uploader.upload(file("image/png", 1)).await, Err(UploadError::NotConfigured)));
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(error_detail(r#"{"error":{"message":"Invalid Signature"}}"#).as_deref(), Some("Invalid Signature"));
        assert_eq!(error_detail("nope").as_deref(), Some("nope"));
        assert_eq!(error_detail(""), None);
    }
}
