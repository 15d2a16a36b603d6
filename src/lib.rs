//! Dependency freshness evaluation for npm projects
//!
//! ```text
//! Depkeeper (rule queue) ──▶ ProjectInspector (declared + installed)
//!          │            └──▶ Registry (npm metadata, npmrc discovery)
//!          └──▶ threshold policy ──▶ outdated dependencies per rule
//! ```
//!
//! - [`pipeline`]: batched rule evaluation
//! - [`version`]: registry client and minimal-version resolution
//! - [`npmrc`]: npm configuration cascade
//! - [`project`]: package.json and node_modules inspection
//! - [`config`]: constants and host environment

pub mod config;
pub mod error;
pub mod npmrc;
pub mod pipeline;
pub mod project;
pub mod version;

pub use error::EngineError;
pub use pipeline::record::{Dependency, Outdated};
pub use pipeline::{Depkeeper, DepkeeperOptions};
pub use project::patterns::Patterns;
pub use version::threshold::{Policy, Strategy, Thresholds};
