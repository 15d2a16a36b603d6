//! Dependency records and outdated projections

use semver::Version;
use serde::Serialize;
use tracing::debug;

use crate::version::error::PolicyError;
use crate::version::semver::parse_version;
use crate::version::threshold::Policy;
use crate::version::types::RegistryResponse;

/// Status text of a declared dependency with no manifest under `node_modules`
pub const NOT_INSTALLED: &str = "Not Installed";

/// One declared dependency with its local and remote state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub name: String,
    /// Installed version, `None` when not installed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
    pub versions: Vec<Version>,
}

impl Dependency {
    pub fn not_installed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            ok: false,
            status: None,
            status_text: Some(NOT_INSTALLED.to_string()),
            latest: None,
            versions: Vec::new(),
        }
    }

    pub fn from_response(
        name: impl Into<String>,
        version: impl Into<String>,
        response: RegistryResponse,
    ) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
            ok: response.ok,
            status: response.status,
            status_text: response.status_text,
            latest: response.latest,
            versions: response.versions,
        }
    }

    /// Projection of this record when it is outdated under `policy`.
    ///
    /// Records that are not ok, or lack an installed or latest version,
    /// cannot be evaluated and yield `None`. An empty policy requires an
    /// exact match with `latest`.
    pub fn outdated(&self, policy: &Policy) -> Result<Option<Outdated>, PolicyError> {
        if !self.ok {
            return Ok(None);
        }
        let (Some(installed), Some(latest)) = (&self.version, &self.latest) else {
            debug!("{}: nothing to compare against", self.name);
            return Ok(None);
        };
        let (Some(current), Some(latest_version)) =
            (parse_version(installed), parse_version(latest))
        else {
            debug!("{}: unparseable version {} or {}", self.name, installed, latest);
            return Ok(None);
        };

        if policy.thresholds.is_empty() {
            if current == latest_version {
                return Ok(None);
            }
            return Ok(Some(Outdated {
                name: self.name.clone(),
                version: installed.clone(),
                minimal: None,
                latest: Some(latest.clone()),
            }));
        }

        let minimal = match policy.minimal(&current, &self.versions)? {
            Some(minimal) if current < minimal => minimal,
            _ => return Ok(None),
        };
        debug!(
            "{}: {} is below minimal {} ({})",
            self.name, current, minimal, policy.strategy
        );

        Ok(Some(Outdated {
            name: self.name.clone(),
            version: installed.clone(),
            minimal: Some(minimal.to_string()),
            latest: Some(latest.clone()),
        }))
    }
}

/// An outdated dependency as reported to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outdated {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest: Option<String>,
}
