//! Run metrics
//!
//! Facade recorders for anchor outcomes plus an in-memory aggregator that
//! backs the end-of-run summary.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use contracts::ContractError;
use metrics::{counter, gauge, histogram};
use serde::Serialize;

/// Record the run-global plan once the engine is built
pub fn record_run_plan(anchors_planned: usize, half_width_s: f64) {
    gauge!("syncview_anchors_planned").set(anchors_planned as f64);
    gauge!("syncview_window_half_width_seconds").set(half_width_s);
}

/// Record one rendered anchor
pub fn record_anchor_rendered(render_time: Duration) {
    counter!("syncview_anchors_rendered_total").increment(1);
    histogram!("syncview_composite_render_seconds").record(render_time.as_secs_f64());
}

/// Record one skipped anchor, labelled by reason
pub fn record_anchor_skipped(reason: &'static str) {
    counter!("syncview_anchors_skipped_total", "reason" => reason).increment(1);
}

/// Aggregates anchor outcomes of one run
#[derive(Debug, Clone, Default)]
pub struct RunMetricsAggregator {
    pub anchors_planned: u64,
    pub rendered: u64,
    pub skipped: u64,
    pub skip_counts: BTreeMap<String, u64>,
    /// Render time per anchor (milliseconds)
    pub render_ms: RunningStats,
    /// Encoded composite size (bytes)
    pub png_bytes: RunningStats,
    /// `(writes, failures)` per sink
    pub sinks: BTreeMap<String, (u64, u64)>,
}

impl RunMetricsAggregator {
    pub fn new(anchors_planned: usize) -> Self {
        Self {
            anchors_planned: anchors_planned as u64,
            ..Self::default()
        }
    }

    pub fn record_rendered(&mut self, render_time: Duration, png_bytes: usize) {
        self.rendered += 1;
        self.render_ms.push(render_time.as_secs_f64() * 1000.0);
        self.png_bytes.push(png_bytes as f64);
    }

    pub fn record_skipped(&mut self, error: &ContractError) {
        self.skipped += 1;
        *self
            .skip_counts
            .entry(error.skip_reason().to_string())
            .or_insert(0) += 1;
    }

    /// Final counters of one sink
    pub fn record_sink(&mut self, name: &str, writes: u64, failures: u64) {
        self.sinks.insert(name.to_string(), (writes, failures));
    }

    pub fn summary(&self, wall_time: Duration, stopped_early: bool) -> RunSummary {
        RunSummary {
            anchors_planned: self.anchors_planned,
            rendered: self.rendered,
            skipped: self.skipped,
            not_started: self
                .anchors_planned
                .saturating_sub(self.rendered + self.skipped),
            skip_counts: self.skip_counts.clone(),
            sinks: self
                .sinks
                .iter()
                .map(|(name, &(writes, failures))| SinkSummary {
                    name: name.clone(),
                    writes,
                    failures,
                })
                .collect(),
            render_ms: StatsSummary::from(&self.render_ms),
            png_bytes: StatsSummary::from(&self.png_bytes),
            wall_time_s: wall_time.as_secs_f64(),
            stopped_early,
        }
    }
}

/// Per-sink line of the run summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct SinkSummary {
    pub name: String,
    pub writes: u64,
    pub failures: u64,
}

/// End-of-run report
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub anchors_planned: u64,
    pub rendered: u64,
    pub skipped: u64,
    /// Anchors never started because the run was interrupted
    pub not_started: u64,
    pub skip_counts: BTreeMap<String, u64>,
    pub sinks: Vec<SinkSummary>,
    pub render_ms: StatsSummary,
    pub png_bytes: StatsSummary,
    pub wall_time_s: f64,
    pub stopped_early: bool,
}

impl RunSummary {
    /// Writes of the named sink
    pub fn sink_writes(&self, name: &str) -> u64 {
        self.sinks
            .iter()
            .find(|s| s.name == name)
            .map_or(0, |s| s.writes)
    }

    /// Failed writes across all sinks
    pub fn sink_failures(&self) -> u64 {
        self.sinks.iter().map(|s| s.failures).sum()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Run Summary ===")?;
        writeln!(f, "Anchors planned: {}", self.anchors_planned)?;
        writeln!(f, "Rendered: {}", self.rendered)?;
        writeln!(f, "Skipped: {}", self.skipped)?;
        for (reason, count) in &self.skip_counts {
            writeln!(f, "  {reason}: {count}")?;
        }
        if self.stopped_early {
            writeln!(f, "Interrupted, not started: {}", self.not_started)?;
        }
        for sink in &self.sinks {
            writeln!(
                f,
                "Sink '{}': {} written, {} failed",
                sink.name, sink.writes, sink.failures
            )?;
        }
        writeln!(f, "Render time (ms): {}", self.render_ms)?;
        writeln!(f, "Composite size (bytes): {}", self.png_bytes)?;
        writeln!(f, "Wall time: {:.2}s", self.wall_time_s)?;
        Ok(())
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            self.m2 += delta * (value - self.mean);
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
