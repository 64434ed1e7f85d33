//! Bearer-token gate for document writes.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WriteDenied {
    /// No admin token configured: writes are disabled.
    #[error("Forbidden: ADMIN_TOKEN not set")]
    NotConfigured,

    /// Token configured but the credential does not match.
    #[error("Unauthorized")]
    BadCredential,
}

/// Check an `Authorization` header value against the configured token.
///
/// Fails closed: with no (or an empty) token, every write is refused.
pub fn authorize_write(admin_token: Option<&str>, authorization: Option<&str>) -> Result<(), WriteDenied> {
    let token = admin_token
        .filter(|t| !t.is_empty())
        .ok_or(WriteDenied::NotConfigured)?;
    match authorization {
        Some(header) if header == format!("Bearer {token}") => Ok(()),
        _ => Err(WriteDenied::BadCredential),
    }
}
