use std::path::{Path, PathBuf};

// =============================================================================
// Registry-related constants
// =============================================================================

/// Registry used when neither an override nor any npmrc source names one
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Timeout for a single metadata fetch in milliseconds (5 seconds)
pub const FETCH_TIMEOUT_MS: u64 = 5_000;

/// Base delay for exponential backoff between retries in milliseconds
pub const RETRY_BASE_DELAY_MS: u64 = 100;

/// Environment variable holding the log filter for the binary
pub const LOG_ENV_VAR: &str = "DEPKEEPER_LOG";

/// Host facts the npmrc cascade needs to locate the user, global and
/// builtin configuration files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// Home directory holding the user `.npmrc`
    pub home_dir: Option<PathBuf>,
    /// Path of the `node` executable
    pub exec_path: Option<PathBuf>,
    pub win32: bool,
    /// `%APPDATA%`, only meaningful on Windows
    pub app_data: Option<PathBuf>,
}

impl Environment {
    /// Detect the environment of the current process
    pub fn detect() -> Self {
        let win32 = cfg!(windows);
        Self {
            home_dir: dirs::home_dir(),
            exec_path: std::env::var_os("PATH")
                .and_then(|paths| find_executable(&paths, node_binary_name(win32))),
            win32,
            app_data: std::env::var_os("APPDATA").map(PathBuf::from),
        }
    }

    /// Location of npm's own builtin configuration file
    pub fn builtin_config_path(&self) -> Option<PathBuf> {
        let exec = self.exec_path.as_deref()?;
        let npm_dir = if self.win32 {
            parent(exec, 1).join("node_modules").join("npm")
        } else {
            parent(exec, 2).join("lib").join("node_modules").join("npm")
        };
        Some(npm_dir.join("npmrc"))
    }

    /// Prefix used when no configuration source defines one
    pub fn default_prefix(&self) -> Option<PathBuf> {
        if self.win32 {
            self.app_data.as_ref().map(|dir| dir.join("npm"))
        } else {
            self.exec_path
                .as_deref()
                .map(|exec| parent(exec, 2).join("npm"))
        }
    }
}

fn node_binary_name(win32: bool) -> &'static str {
    if win32 { "node.exe" } else { "node" }
}

fn find_executable(paths: &std::ffi::OsStr, name: &str) -> Option<PathBuf> {
    std::env::split_paths(paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// `levels` directories up from `path`, stopping at the root
fn parent(path: &Path, levels: usize) -> PathBuf {
    let mut current = path;
    for _ in 0..levels {
        current = current.parent().unwrap_or(current);
    }
    current.to_path_buf()
}
