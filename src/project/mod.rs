//! Project inspection: declared dependencies and local install state
//!
//! - [`package_json`]: manifest formats
//! - [`patterns`]: include patterns selecting dependencies by name

pub mod package_json;
pub mod patterns;

use std::path::PathBuf;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::debug;

use crate::project::package_json::{InstalledPackageJson, PackageJson};
use crate::project::patterns::Patterns;

/// Error type for project inspection
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProjectError {
    /// The project manifest could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// The project manifest is not valid JSON
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// An include pattern is not a valid glob
    #[error("Invalid include pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// Source of declared dependencies and their installed versions
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ProjectInspector: Send + Sync {
    /// Declared dependency names matching any of `patterns`, in declaration order
    async fn declared_dependencies(&self, patterns: &Patterns)
    -> Result<Vec<String>, ProjectError>;

    /// Version installed on disk, `None` when not installed
    async fn installed_version(&self, name: &str) -> Option<String>;
}

/// Node project rooted at a directory with `package.json` and `node_modules`
#[derive(Debug, Clone)]
pub struct NodeProject {
    cwd: PathBuf,
}

impl NodeProject {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }

    /// Manifest of `name` under `node_modules`, `None` for names that are
    /// not package names and could resolve outside it
    fn installed_manifest_path(&self, name: &str) -> Option<PathBuf> {
        is_package_name(name).then(|| {
            self.cwd
                .join("node_modules")
                .join(name)
                .join("package.json")
        })
    }
}

/// `name` or `@scope/name`, without empty, dot-leading or backslashed segments
fn is_package_name(name: &str) -> bool {
    let segment = |s: &str| !s.is_empty() && !s.starts_with('.') && !s.contains('\\');

    let mut parts = name.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scope), Some(package), None) => {
            scope.strip_prefix('@').is_some_and(segment) && segment(package)
        }
        (Some(package), None, None) => !package.starts_with('@') && segment(package),
        _ => false,
    }
}

#[async_trait::async_trait]
impl ProjectInspector for NodeProject {
    async fn declared_dependencies(
        &self,
        patterns: &Patterns,
    ) -> Result<Vec<String>, ProjectError> {
        let matcher = patterns.compile()?;
        let path = self.cwd.join("package.json");

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ProjectError::Read {
                path: path.clone(),
                source: Arc::new(source),
            })?;
        let manifest = PackageJson::parse(&content).map_err(|source| ProjectError::Parse {
            path,
            source: Arc::new(source),
        })?;

        Ok(matcher.select(&manifest.declared_names()))
    }

    async fn installed_version(&self, name: &str) -> Option<String> {
        let Some(path) = self.installed_manifest_path(name) else {
            debug!("{} is not a package name, treating as not installed", name);
            return None;
        };

        let content = tokio::fs::read_to_string(&path)
            .await
            .inspect_err(|e| debug!("{} is not installed: {}", name, e))
            .ok()?;

        InstalledPackageJson::parse(&content)
            .inspect_err(|e| debug!("Unreadable manifest for {}: {}", name, e))
            .ok()?
            .version
    }
}
