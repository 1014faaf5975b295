//! Core pipeline orchestration and domain logic for VRAC.
//!
//! This crate ties together the source registry, dialect parsers,
//! deduplication, enrichment and artifact writing into the end-to-end
//! `process` run ([`pipeline::run_pipeline`]).

pub mod dedup;
pub mod enrichment;
pub mod pipeline;
pub mod taxonomy;

pub use dedup::deduplicate;
pub use pipeline::{
    PipelineConfig, ProgressReporter, RunReport, RunStats, SilentProgress, run_pipeline,
};
pub use taxonomy::classify;
