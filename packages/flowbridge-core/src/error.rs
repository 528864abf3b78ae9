//! `PipelineError` (§1.2, §7): the truly-exceptional path, reserved for
//! conditions the validation taxonomy cannot represent as a value —
//! cancellation and internal invariant breaks. Malformed or merely
//! suboptimal input never reaches here; it becomes an [`crate::validation::Issue`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("import was cancelled")]
    Cancelled,
    #[error("internal invariant violated: {0}")]
    Internal(String),
}
