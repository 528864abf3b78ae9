//! `LlmError`, the one `thiserror` enum on the pipeline's single outbound
//! I/O boundary (§9). Every variant degrades cleanly to the deterministic
//! baseline in `flowbridge_core::semantic_patch`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("semantic patch request exceeded its deadline")]
    Timeout,
    #[error("semantic patch request was cancelled")]
    Cancelled,
    #[error("network error calling semantic patch endpoint: {0}")]
    Network(#[from] reqwest::Error),
    #[error("semantic patch response rejected: {0}")]
    BadResponse(String),
}
