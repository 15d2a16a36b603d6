//! Shared fixtures for end-to-end tests

#![allow(dead_code)]

mod project;
mod registry;

pub use project::*;
pub use registry::*;
