//! Pipeline orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{resolve_workers, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
