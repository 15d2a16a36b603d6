//! npm registry API implementation

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_ENCODING};
use serde::Deserialize;
use serde::de::IgnoredAny;
use tracing::{debug, warn};

use crate::config::{DEFAULT_REGISTRY_URL, FETCH_TIMEOUT_MS, RETRY_BASE_DELAY_MS};
use crate::npmrc::Npmrc;
use crate::npmrc::auth::{auth_token_key, normalize_registry_url};
use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::semver::available_versions;
use crate::version::types::RegistryResponse;

/// Content negotiation npm clients send; prefers the abbreviated document
const ACCEPT_METADATA: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";

/// Response from npm registry API
#[derive(Debug, Default, Deserialize)]
struct NpmPackageResponse {
    #[serde(default, rename = "dist-tags")]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, IgnoredAny>,
}

/// Registry implementation for npm-compatible registries.
///
/// The registry location and credentials come from the npmrc cascade of the
/// project directory unless an explicit URL is configured.
pub struct NpmRegistry {
    client: reqwest::Client,
    npmrc: Npmrc,
    registry_url: Option<String>,
    timeout: Duration,
    include_prerelease: bool,
    max_retries: u32,
}

impl NpmRegistry {
    /// Creates an NpmRegistry configured from the npmrc files around `cwd`
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self::with_npmrc(Npmrc::new(cwd))
    }

    /// Creates an NpmRegistry on top of an existing npmrc cascade
    pub fn with_npmrc(npmrc: Npmrc) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(concat!("depkeeper/", env!("CARGO_PKG_VERSION")))
                .build()
                .expect("Failed to create HTTP client"),
            npmrc,
            registry_url: None,
            timeout: Duration::from_millis(FETCH_TIMEOUT_MS),
            include_prerelease: false,
            max_retries: 0,
        }
    }

    /// Use `registry_url` for every package, ignoring npmrc registry keys
    pub fn with_registry_url(mut self, registry_url: impl Into<String>) -> Self {
        self.registry_url = Some(registry_url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Keep pre-release versions in the available versions
    pub fn with_prereleases(mut self, include: bool) -> Self {
        self.include_prerelease = include;
        self
    }

    /// Retry transport failures and timeouts with exponential backoff
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Registry base URL that serves `package_name`.
    ///
    /// Explicit override, then `@scope:registry` for scoped names, then
    /// `registry`, then the public npm registry.
    pub async fn registry_url(&self, package_name: &str) -> String {
        if let Some(url) = &self.registry_url {
            return url.clone();
        }

        if let Some(scope) = Self::scope_of(package_name)
            && let Some(url) = self.npmrc.get(&format!("{}:registry", scope)).await
        {
            return url;
        }

        self.npmrc
            .get("registry")
            .await
            .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string())
    }

    /// `@scope` of a scoped package name
    fn scope_of(package_name: &str) -> Option<&str> {
        if !package_name.starts_with('@') {
            return None;
        }
        package_name.split_once('/').map(|(scope, _)| scope)
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    async fn fetch(&self, package_name: &str) -> Result<RegistryResponse, RegistryError> {
        let registry_url = normalize_registry_url(&self.registry_url(package_name).await);
        let token = self.npmrc.get(&auth_token_key(&registry_url)?).await;
        let url = format!(
            "{}{}",
            registry_url,
            Self::encode_package_name(package_name)
        );

        let mut attempt = 0;
        let mut delay = RETRY_BASE_DELAY_MS;
        loop {
            match self.fetch_once(&url, token.as_deref()).await {
                Err(e @ (RegistryError::Timeout | RegistryError::Network { .. }))
                    if attempt < self.max_retries =>
                {
                    debug!("Retrying {} after {}: attempt {}", url, e, attempt + 1);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                    delay *= 2;
                }
                result => return result,
            }
        }
    }

    async fn fetch_once(
        &self,
        url: &str,
        token: Option<&str>,
    ) -> Result<RegistryResponse, RegistryError> {
        let mut request = self
            .client
            .get(url)
            .header(ACCEPT_ENCODING, "gzip")
            .header(ACCEPT, ACCEPT_METADATA)
            .timeout(self.timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or_default().to_string();

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Ok(RegistryResponse::http_error(status.as_u16(), status_text));
        }

        let body = response.bytes().await?;
        let package_info: NpmPackageResponse = if body.is_empty() {
            NpmPackageResponse::default()
        } else {
            serde_json::from_slice(&body).map_err(|e| {
                warn!("Failed to parse npm registry response: {}", e);
                RegistryError::InvalidResponse(e.to_string())
            })?
        };

        Ok(RegistryResponse {
            ok: true,
            status: Some(status.as_u16()),
            status_text: Some(status_text),
            latest: package_info.dist_tags.get("latest").cloned(),
            versions: available_versions(package_info.versions.keys(), self.include_prerelease),
        })
    }
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn get_versions(&self, package_name: &str) -> RegistryResponse {
        match self.fetch(package_name).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch {} from npm registry: {}", package_name, e);
                RegistryResponse::failed(e.status_text())
            }
        }
    }
}
