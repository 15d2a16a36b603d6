use thiserror::Error;

use crate::project::ProjectError;
use crate::version::error::PolicyError;

/// Failures fatal to an evaluation call.
///
/// Per-dependency failures (not installed, unreachable registry) never show
/// up here; they are folded into the records.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error(transparent)]
    Policy(#[from] PolicyError),
}
