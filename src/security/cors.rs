//! Origin allow-listing.
//!
//! # Responsibilities
//! - Decide whether a request Origin may read responses
//! - Support `*`, an explicit list, and trusted host suffixes
//!
//! # Design Decisions
//! - Wildcard mode echoes the request Origin when there is one
//! - Suffixes match the host itself or any subdomain of it
//! - Origins are compared exactly, suffixes case-insensitively

use url::Url;

use crate::config::CorsConfig;

/// Methods advertised on every response.
pub const ALLOW_METHODS: &str = "GET,PUT,POST,OPTIONS";

/// Request headers advertised on every response.
pub const ALLOW_HEADERS: &str = "Content-Type,Authorization";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    Any,
    Origins(Vec<String>),
}

/// Outcome for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDecision {
    /// `Access-Control-Allow-Origin: *`.
    Wildcard,
    /// Echo this origin back (and add `Vary: Origin`).
    Echo(String),
    /// Origin present but not allowed.
    Denied,
    /// No Origin header and no wildcard; emit nothing.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    allow: AllowList,
    trusted_suffixes: Vec<String>,
}

impl CorsPolicy {
    pub fn new(allow: AllowList, trusted_suffixes: Vec<String>) -> Self {
        let trusted_suffixes = trusted_suffixes
            .into_iter()
            .map(|s| s.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { allow, trusted_suffixes }
    }

    pub fn from_config(config: &CorsConfig) -> Self {
        let raw = config.allowed_origins.trim();
        let allow = if raw == "*" {
            AllowList::Any
        } else {
            AllowList::Origins(
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect(),
            )
        };
        Self::new(allow, config.trusted_suffixes.clone())
    }

    pub fn decide(&self, origin: Option<&str>) -> OriginDecision {
        let origin = origin.map(str::trim).filter(|o| !o.is_empty());
        match (&self.allow, origin) {
            (AllowList::Any, Some(origin)) => OriginDecision::Echo(origin.to_string()),
            (AllowList::Any, None) => OriginDecision::Wildcard,
            (AllowList::Origins(_), None) => OriginDecision::Absent,
            (AllowList::Origins(list), Some(origin)) => {
                if list.iter().any(|o| o == origin) || self.matches_suffix(origin) {
                    OriginDecision::Echo(origin.to_string())
                } else {
                    OriginDecision::Denied
                }
            }
        }
    }

    fn matches_suffix(&self, origin: &str) -> bool {
        let Some(host) = Url::parse(origin).ok().and_then(|u| u.host_str().map(str::to_ascii_lowercase)) else {
            return false;
        };
        self.trusted_suffixes.iter().any(|suffix| {
            host == *suffix
                || host
                    .strip_suffix(suffix.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}
