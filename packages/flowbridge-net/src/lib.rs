//! The pipeline's single outbound I/O boundary: a typed client for the
//! semantic patch endpoint (§4.8, §5, §6). `flowbridge-core` depends on
//! this crate only for the `LlmClient` trait and the protocol types —
//! never on `reqwest` directly — so the deterministic-baseline fallback
//! behaves identically whether the real client errors or the mock client
//! is configured.

pub mod client;
pub mod error;
pub mod protocol;

pub use client::{HttpLlmClient, LlmClient, MockLlmClient};
pub use error::LlmError;
pub use protocol::{
    ComponentRef, ComponentRename, CssPatch, CssPatchOp, DomOutlineNode, HtmlPatch, HtmlPatchOp,
    ResponseMode, SemanticEnvelope, SemanticEnvelopeMeta, SemanticPatchRequest,
    SemanticPatchResponse,
};
