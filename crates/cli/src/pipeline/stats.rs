//! Pipeline statistics.

use std::path::PathBuf;

use observability::RunSummary;
use serde::Serialize;

/// Statistics from a pipeline run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    /// Anchor outcomes, sink counters and timings
    #[serde(flatten)]
    pub summary: RunSummary,

    /// Where composites were written
    pub output_directory: PathBuf,

    /// Concurrent anchor workers used
    pub workers: usize,
}

impl PipelineStats {
    /// Rendered composites per second of wall time
    pub fn throughput(&self) -> f64 {
        if self.summary.wall_time_s > 0.0 {
            self.summary.rendered as f64 / self.summary.wall_time_s
        } else {
            0.0
        }
    }

    /// Print the human readable summary
    pub fn print_summary(&self) {
        println!();
        print!("{}", self.summary);
        println!("Throughput: {:.2} composites/s", self.throughput());
        println!("Workers: {}", self.workers);
        println!("Output: {}", self.output_directory.display());
        println!();
    }
}
