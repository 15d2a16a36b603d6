//! npmrc configuration cascade
//!
//! Looks a key up in the four npm configuration sources, in order, and
//! stops at the first source that defines it:
//!
//! 1. project: `<cwd>/.npmrc`
//! 2. user: `<home>/.npmrc`
//! 3. global: `<prefix>/etc/npmrc`, where `prefix` is itself looked up in the
//!    other three sources (never in the global source)
//! 4. builtin: `npmrc` inside the npm installation next to `node`
//!
//! Each source is read and parsed at most once per [`Npmrc`] instance.
//! Missing or unreadable files define nothing; the lookup moves on.
//!
//! # Modules
//!
//! - [`auth`]: nerf-dart registry identities for credential keys
//! - [`parser`]: ini-style npmrc parser

pub mod auth;
pub mod parser;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
#[cfg(test)]
use mockall::automock;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::config::Environment;
use crate::npmrc::parser::NpmrcValues;

/// Reads a text file; the configuration cascade's only I/O
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait TextReader: Send + Sync {
    async fn read_to_string(&self, path: &Path) -> std::io::Result<String>;
}

/// [`TextReader`] backed by the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

#[async_trait::async_trait]
impl TextReader for FsReader {
    async fn read_to_string(&self, path: &Path) -> std::io::Result<String> {
        tokio::fs::read_to_string(path).await
    }
}

/// A configuration source in the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Project,
    User,
    Global,
    Builtin,
}

impl Source {
    /// Highest priority first
    pub const CASCADE: [Source; 4] = [
        Source::Project,
        Source::User,
        Source::Global,
        Source::Builtin,
    ];

    /// Sources consulted for `prefix`, which locates the global source
    const PREFIX_CASCADE: [Source; 3] = [Source::Project, Source::User, Source::Builtin];

    fn index(&self) -> usize {
        match self {
            Source::Project => 0,
            Source::User => 1,
            Source::Global => 2,
            Source::Builtin => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Project => "project",
            Source::User => "user",
            Source::Global => "global",
            Source::Builtin => "builtin",
        }
    }
}

/// Memoized npmrc cascade for one working directory
pub struct Npmrc {
    cwd: PathBuf,
    env: Environment,
    reader: Arc<dyn TextReader>,
    loaded: [OnceCell<Option<Arc<NpmrcValues>>>; 4],
}

impl Npmrc {
    /// Cascade for `cwd` in the detected process environment
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self::with_env(cwd, Environment::detect())
    }

    pub fn with_env(cwd: impl Into<PathBuf>, env: Environment) -> Self {
        Self {
            cwd: cwd.into(),
            env,
            reader: Arc::new(FsReader),
            loaded: Default::default(),
        }
    }

    /// Replace the file reader
    pub fn with_reader(mut self, reader: Arc<dyn TextReader>) -> Self {
        self.reader = reader;
        self
    }

    /// Value of `key` from the first source that defines it
    pub async fn get(&self, key: &str) -> Option<String> {
        self.find(key, &Source::CASCADE).await
    }

    async fn find(&self, key: &str, sources: &[Source]) -> Option<String> {
        for &source in sources {
            let Some(values) = self.values(source).await else {
                continue;
            };

            if let Some(value) = values.get(key).filter(|v| !v.is_empty()) {
                debug!("npmrc: {} found in {} config", key, source.as_str());
                return Some(value.clone());
            }
        }

        debug!("npmrc: {} not defined", key);
        None
    }

    async fn values(&self, source: Source) -> Option<Arc<NpmrcValues>> {
        self.loaded[source.index()]
            .get_or_init(|| self.load(source))
            .await
            .clone()
    }

    async fn load(&self, source: Source) -> Option<Arc<NpmrcValues>> {
        let path = self.path(source).await?;

        match self.reader.read_to_string(&path).await {
            Ok(content) => {
                debug!("npmrc: loaded {} config from {:?}", source.as_str(), path);
                Some(Arc::new(parser::parse(&content)))
            }
            Err(e) => {
                debug!(
                    "npmrc: skipping {} config {:?}: {}",
                    source.as_str(),
                    path,
                    e
                );
                None
            }
        }
    }

    async fn path(&self, source: Source) -> Option<PathBuf> {
        match source {
            Source::Project => Some(self.cwd.join(".npmrc")),
            Source::User => self.env.home_dir.as_ref().map(|home| home.join(".npmrc")),
            Source::Global => self
                .prefix()
                .await
                .map(|prefix| prefix.join("etc").join("npmrc")),
            Source::Builtin => self.env.builtin_config_path(),
        }
    }

    /// `prefix` from every source but the global one, else the default.
    /// Boxed because the lookup re-enters the cascade.
    fn prefix(&self) -> BoxFuture<'_, Option<PathBuf>> {
        async move {
            self.find("prefix", &Source::PREFIX_CASCADE)
                .await
                .map(PathBuf::from)
                .or_else(|| self.env.default_prefix())
        }
        .boxed()
    }
}
