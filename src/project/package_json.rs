//! package.json manifests

use indexmap::IndexMap;
use serde::Deserialize;

/// Dependency sections of a project manifest
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageJson {
    pub dependencies: IndexMap<String, serde_json::Value>,
    pub dev_dependencies: IndexMap<String, serde_json::Value>,
    pub peer_dependencies: IndexMap<String, serde_json::Value>,
    pub optional_dependencies: IndexMap<String, serde_json::Value>,
}

impl PackageJson {
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Union of all dependency sections.
    ///
    /// A name keeps the position of its first declaration.
    pub fn declared_names(&self) -> Vec<String> {
        let mut names: IndexMap<&str, ()> = IndexMap::new();
        for section in [
            &self.dependencies,
            &self.dev_dependencies,
            &self.peer_dependencies,
            &self.optional_dependencies,
        ] {
            for name in section.keys() {
                names.entry(name.as_str()).or_insert(());
            }
        }
        names.into_keys().map(str::to_string).collect()
    }
}

/// Manifest of an installed package under `node_modules`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InstalledPackageJson {
    pub version: Option<String>,
}

impl InstalledPackageJson {
    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }
}
