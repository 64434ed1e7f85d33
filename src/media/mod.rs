//! Media host integration.
//!
//! `signature.rs` is the server half (the shared secret never leaves the
//! edge service); `upload.rs` is the editor half that validates files and
//! sends them straight to the host.

pub mod signature;
pub mod upload;

pub use signature::{sign, string_to_sign, SignParams, SignedUpload};
pub use upload::{MediaFile, MediaKind, UploadError, UploadSettings, Uploader};
