//! Artifact writers for the VRAC pipeline.
//!
//! Produces the canonical JSON output document and the supplemental
//! health-index CSV export. Every file is written atomically: content goes
//! to a temp file in the target directory which is then renamed over the
//! destination.

pub mod health_csv;
pub mod output;

pub use health_csv::{HEALTH_INDEX_CSV_HEADER, render_health_index_csv};
pub use output::{
    ArtifactMeta, StagedFile, periods_digest, read_output, render_output, stage_output,
    stage_text, write_text_atomic,
};
