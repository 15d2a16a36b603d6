//! Registry trait for fetching package metadata

#[cfg(test)]
use mockall::automock;

use crate::version::types::RegistryResponse;

/// Trait for fetching package metadata from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches the `latest` dist-tag and available versions for a package
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "@types/node")
    ///
    /// # Returns
    /// Never fails: unreachable registries, timeouts and malformed responses
    /// come back as a [`RegistryResponse`] with `ok == false`.
    async fn get_versions(&self, package_name: &str) -> RegistryResponse;
}
