//! The flowbridge import pipeline: data model, normalizer, componentizer,
//! emitter, and safety gate (§3–§5 of the spec this crate implements).
//!
//! [`pipeline::process_import`] is the single entrypoint; everything else
//! is a stage it composes, exposed individually so callers embedding a
//! subset of the pipeline (or testing a stage in isolation) aren't forced
//! through the whole thing.

pub mod componentize;
pub mod config;
pub mod decouple;
pub mod emit;
pub mod error;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod safety;
pub mod semantic_patch;
pub mod validation;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use model::ArtifactBundle;
pub use pipeline::{process_import, Stage};
