//! Project fixtures on a temporary filesystem

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use depkeeper::project::patterns::Patterns;
use depkeeper::project::{NodeProject, ProjectError, ProjectInspector};

/// Temporary directory populated with `files` (relative path, content)
pub fn create_project(files: &[(String, String)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (rel, content) in files {
        write(dir.path(), rel, content);
    }
    dir
}

pub fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// `package.json` declaring `deps` as runtime dependencies
pub fn manifest(deps: &[&str]) -> (String, String) {
    let dependencies: serde_json::Map<_, _> = deps
        .iter()
        .map(|name| (name.to_string(), serde_json::Value::String(String::new())))
        .collect();
    (
        "package.json".to_string(),
        serde_json::json!({ "dependencies": dependencies }).to_string(),
    )
}

/// `node_modules/<name>/package.json` for an installed dependency
pub fn installed(name: &str, version: &str) -> (String, String) {
    (
        format!("node_modules/{}/package.json", name),
        serde_json::json!({ "name": name, "version": version }).to_string(),
    )
}

/// [`NodeProject`] counting how often the declared dependencies are read
pub struct CountingProject {
    inner: NodeProject,
    declared_calls: AtomicUsize,
}

impl CountingProject {
    pub fn new(root: &Path) -> Arc<Self> {
        Arc::new(Self {
            inner: NodeProject::new(root),
            declared_calls: AtomicUsize::new(0),
        })
    }

    pub fn declared_calls(&self) -> usize {
        self.declared_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectInspector for CountingProject {
    async fn declared_dependencies(
        &self,
        patterns: &Patterns,
    ) -> Result<Vec<String>, ProjectError> {
        self.declared_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.declared_dependencies(patterns).await
    }

    async fn installed_version(&self, name: &str) -> Option<String> {
        self.inner.installed_version(name).await
    }
}
