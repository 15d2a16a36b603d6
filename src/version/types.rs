//! Normalized registry response

use semver::Version;
use serde::Serialize;

/// Result of a metadata fetch for one package.
///
/// Every failure (transport, timeout, non-success status, malformed body)
/// is folded into `ok == false` with an empty `versions` list, so callers
/// can filter instead of propagating errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistryResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    /// Version the `latest` dist-tag points to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    /// Ascending, deduplicated, valid semver only
    pub versions: Vec<Version>,
}

impl RegistryResponse {
    /// Response for a package with no reachable metadata
    pub fn failed(status_text: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: None,
            status_text: Some(status_text.into()),
            latest: None,
            versions: Vec::new(),
        }
    }

    /// Response for a non-success HTTP status
    pub fn http_error(status: u16, status_text: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            ..Self::failed(status_text)
        }
    }
}
