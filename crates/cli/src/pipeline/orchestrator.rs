//! Pipeline orchestrator - coordinates all components.
//!
//! Sources and engine are built first, so every fatal precondition fails
//! before the output directory is touched. Anchors are then rendered on
//! blocking worker threads (bounded by a semaphore) and the finished
//! composites are forwarded to the dispatcher.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use compositor::AnchorComposer;
use contracts::{ContractError, RenderedComposite, RunBlueprint};
use ingestion::{MockDataset, MockDatasetConfig, SourceSet};
use observability::{
    record_anchor_rendered, record_anchor_skipped, record_run_plan, RunMetricsAggregator,
};
use sync_engine::{AlignmentEngine, EngineInputs, EngineSettings, EngineSummary};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use super::PipelineStats;
use crate::error::{CliError, Result};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The validated run configuration
    pub blueprint: RunBlueprint,

    /// Generate an in-memory data set instead of opening the sources
    pub mock: bool,

    /// Render at most this many anchors (None = whole range)
    pub max_anchors: Option<usize>,

    /// Concurrent anchor workers, already resolved (> 0)
    pub workers: usize,
}

/// `0` means one worker per available core
pub fn resolve_workers(requested: usize) -> usize {
    if requested > 0 {
        requested
    } else {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

type AnchorOutcome = (usize, Duration, std::result::Result<RenderedComposite, ContractError>);

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
    stop: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Setting the flag stops new anchors from starting
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    fn open_sources(&self) -> Result<SourceSet> {
        if self.config.mock {
            let mock = MockDatasetConfig::from_blueprint(&self.config.blueprint);
            info!(
                primary_frames = mock.primary_timestamps.len(),
                secondary_frames = mock.secondary_timestamps.len(),
                "Running in MOCK mode (generated data set)"
            );
            Ok(SourceSet::from(MockDataset::generate(&mock)?))
        } else {
            Ok(SourceSet::open(&self.config.blueprint)?)
        }
    }

    fn settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::from_blueprint(&self.config.blueprint);
        if self.config.mock {
            settings.timing.decoder =
                MockDatasetConfig::from_blueprint(&self.config.blueprint).timing_decoder();
        }
        settings
    }

    /// Open the sources and run every fatal precondition check
    #[instrument(name = "pipeline_build_engine", skip(self), fields(mock = self.config.mock))]
    pub fn build_engine(&self) -> Result<(SourceSet, AlignmentEngine)> {
        let sources = self.open_sources()?;
        let engine = AlignmentEngine::new(
            EngineInputs {
                primary: sources.primary.as_ref(),
                secondary: sources.secondary.as_ref(),
                sensor: sources.sensor.as_ref(),
                audio: sources.audio.as_ref(),
            },
            &self.settings(),
        )?;
        Ok((sources, engine))
    }

    /// Run-global plan without rendering anything
    pub fn plan(&self) -> Result<EngineSummary> {
        let (_, engine) = self.build_engine()?;
        Ok(engine.summary())
    }

    /// Render every planned anchor
    #[instrument(name = "pipeline_run", skip(self), fields(workers = self.config.workers))]
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let (sources, engine) = self.build_engine()?;

        let summary = engine.summary();
        let mut anchors: Vec<usize> = engine.anchor_range().collect();
        if let Some(max) = self.config.max_anchors {
            anchors.truncate(max);
        }
        record_run_plan(anchors.len(), summary.half_width_s);
        info!(
            anchors = anchors.len(),
            first = ?anchors.first(),
            last = ?anchors.last(),
            half_width_s = summary.half_width_s,
            sensor_scale = summary.sensor_scale,
            audio_scale = summary.audio_scale,
            "Alignment plan ready"
        );
        if anchors.is_empty() {
            warn!("No anchor has a full neighbourhood, nothing to render");
        }

        let output = &self.config.blueprint.output;
        let (composite_tx, composite_rx) = mpsc::channel(output.queue_capacity.max(1));
        let dispatcher_handle = dispatcher::create_dispatcher(output, composite_rx)?.spawn();
        info!(directory = %output.directory.display(), "Dispatcher started");

        let composer = Arc::new(AnchorComposer::new(
            Arc::new(engine),
            Arc::clone(&sources.primary),
            Arc::clone(&sources.secondary),
            &self.config.blueprint.layout,
        ));
        let semaphore = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let mut tasks: JoinSet<AnchorOutcome> = JoinSet::new();
        let mut run = RunMetricsAggregator::new(anchors.len());
        let mut fatal: Option<CliError> = None;

        for anchor in anchors {
            if self.stopped() || fatal.is_some() {
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            if self.stopped() {
                break;
            }

            let composer = Arc::clone(&composer);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                let started = Instant::now();
                let result = composer.compose(anchor);
                (anchor, started.elapsed(), result)
            });

            while let Some(joined) = tasks.try_join_next() {
                collect_outcome(joined, &composite_tx, &mut run, &mut fatal).await;
            }
        }

        if self.stopped() {
            warn!(in_flight = tasks.len(), "Stop requested, finishing in-flight anchors");
        }
        while let Some(joined) = tasks.join_next().await {
            collect_outcome(joined, &composite_tx, &mut run, &mut fatal).await;
        }

        // Closing the channel lets the dispatcher drain and stop.
        drop(composite_tx);
        let report = dispatcher_handle
            .await
            .map_err(|e| CliError::worker(format!("dispatcher task: {e}")))?;
        for (name, snapshot) in &report {
            run.record_sink(name, snapshot.write_count, snapshot.failure_count);
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        let stats = PipelineStats {
            summary: run.summary(start_time.elapsed(), self.stopped()),
            output_directory: output.directory.clone(),
            workers: self.config.workers,
        };

        info!(
            rendered = stats.summary.rendered,
            skipped = stats.summary.skipped,
            duration_secs = stats.summary.wall_time_s,
            throughput = format!("{:.2}", stats.throughput()),
            "Pipeline complete"
        );

        Ok(stats)
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Route one finished anchor: forward, count a skip, or record a fatal error
async fn collect_outcome(
    joined: std::result::Result<AnchorOutcome, JoinError>,
    composite_tx: &mpsc::Sender<RenderedComposite>,
    run: &mut RunMetricsAggregator,
    fatal: &mut Option<CliError>,
) {
    match joined {
        Ok((anchor, elapsed, Ok(composite))) => {
            record_anchor_rendered(elapsed);
            run.record_rendered(elapsed, composite.png.len());
            debug!(
                anchor,
                render_ms = elapsed.as_secs_f64() * 1000.0,
                "Anchor rendered"
            );
            if composite_tx.send(composite).await.is_err() && fatal.is_none() {
                *fatal = Some(CliError::DispatcherClosed { anchor });
            }
        }
        Ok((anchor, _, Err(e))) if e.is_recoverable() => {
            record_anchor_skipped(e.skip_reason());
            run.record_skipped(&e);
            warn!(anchor, reason = e.skip_reason(), error = %e, "Anchor skipped");
        }
        Ok((anchor, _, Err(e))) => {
            error!(anchor, error = %e, "Anchor failed");
            if fatal.is_none() {
                *fatal = Some(e.into());
            }
        }
        Err(e) => {
            error!(error = %e, "Anchor worker failed");
            if fatal.is_none() {
                *fatal = Some(CliError::worker(e.to_string()));
            }
        }
    }
}
