//! # Observability
//!
//! Tracing setup and run metrics.
//!
//! ## Features
//!
//! - Tracing initialisation (JSON / pretty / compact), `RUST_LOG` aware
//! - `metrics` facade counters for anchor outcomes and render time
//! - In-memory aggregation for the end-of-run summary
//!
//! No exporter is installed here; the facade calls are no-ops unless the
//! embedding application installs a recorder.
//!
//! ## Usage Example
//!
//! ```ignore
//! use observability::{record_anchor_rendered, RunMetricsAggregator};
//!
//! observability::init()?;
//!
//! let mut run = RunMetricsAggregator::new(planned);
//! match composer.compose(anchor) {
//!     Ok(c) => {
//!         record_anchor_rendered(elapsed);
//!         run.record_rendered(elapsed, c.png.len());
//!     }
//!     Err(e) => run.record_skipped(&e),
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-exports
pub use crate::metrics::{
    record_anchor_rendered, record_anchor_skipped, record_run_plan, RunMetricsAggregator,
    RunSummary, RunningStats, StatsSummary,
};

/// Initialise tracing with the default configuration
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log output format
    pub log_format: LogFormat,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Compact,
            default_log_level: "info".to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs
    Json,
    /// Multi-line human readable
    Pretty,
    /// Single-line human readable
    #[default]
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!(
                "unknown log format '{other}' (expected json, pretty or compact)"
            )),
        }
    }
}

/// Initialise tracing with a custom configuration
///
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_log_level))
        .context("Invalid log filter")?;

    match config.log_format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer().pretty().with_writer(std::io::stderr);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer().compact().with_writer(std::io::stderr);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
    }

    tracing::debug!(log_format = ?config.log_format, "Observability initialized");

    Ok(())
}
