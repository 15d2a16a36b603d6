//! Version layer: registry metadata and minimal-version resolution
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Registries │────▶│   Semver    │────▶│  Threshold  │
//! │   (fetch)   │     │ (normalize) │     │  (minimal)  │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`registry`]: Registry trait for fetching package metadata
//! - [`registries`]: Concrete registry implementations (npm)
//! - [`threshold`]: Threshold policies and the two resolution strategies
//! - [`semver`]: Shared semver utilities
//! - [`types`]: Normalized registry response
//! - [`error`]: Error types for registry and policy failures

pub mod error;
pub mod registries;
pub mod registry;
pub mod semver;
pub mod threshold;
pub mod types;
