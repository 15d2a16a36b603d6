//! Registry test utilities

use std::path::Path;
use std::sync::Arc;

use mockito::{Mock, ServerGuard};

use depkeeper::config::Environment;
use depkeeper::npmrc::Npmrc;
use depkeeper::Depkeeper;
use depkeeper::project::{NodeProject, ProjectInspector};
use depkeeper::version::registries::NpmRegistry;

/// Serve npm metadata for `name`; the last version is the `latest` dist-tag
pub async fn mock_dependency_meta(server: &mut ServerGuard, name: &str, versions: &[&str]) -> Mock {
    dependency_meta(server, name, versions).create_async().await
}

/// Unregistered metadata mock, for setting hit expectations first
pub fn dependency_meta(server: &mut ServerGuard, name: &str, versions: &[&str]) -> Mock {
    let body = serde_json::json!({
        "_id": name,
        "name": name,
        "dist-tags": { "latest": versions.last() },
        "versions": versions
            .iter()
            .map(|v| (v.to_string(), serde_json::json!({})))
            .collect::<serde_json::Map<_, _>>(),
    });

    server
        .mock("GET", format!("/{}", name).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
}

/// npm registry for `root` that ignores the host's user, global and builtin
/// configuration
pub fn isolated_registry(root: &Path) -> NpmRegistry {
    NpmRegistry::with_npmrc(Npmrc::with_env(root, Environment::default()))
}

/// Engine for the project at `root` talking to `registry_url`
pub fn create_depkeeper(root: &Path, registry_url: &str) -> Depkeeper {
    create_depkeeper_with(Arc::new(NodeProject::new(root)), root, registry_url)
}

pub fn create_depkeeper_with(
    inspector: Arc<dyn ProjectInspector>,
    root: &Path,
    registry_url: &str,
) -> Depkeeper {
    Depkeeper::with_components(
        inspector,
        Arc::new(isolated_registry(root).with_registry_url(registry_url)),
    )
}
