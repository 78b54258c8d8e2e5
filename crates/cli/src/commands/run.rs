//! `run` command implementation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use sync_engine::EngineSummary;
use tracing::{info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::pipeline::{resolve_workers, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = load_blueprint(&args.config)?;

    // Apply CLI overrides
    if let Some(ref output) = args.output {
        info!(output = %output.display(), "Overriding output directory from CLI");
        blueprint.output.directory = output.clone();
    }
    if let Some(workers) = args.workers {
        info!(workers, "Overriding worker count from CLI");
        blueprint.run.workers = workers;
    }
    config_loader::ConfigLoader::validate(&blueprint).context("Invalid CLI override")?;

    let workers = resolve_workers(blueprint.run.workers);
    info!(
        primary = %blueprint.sources.primary_video.display(),
        secondary = %blueprint.sources.secondary_video.display(),
        signal = %blueprint.channels.signal,
        output = %blueprint.output.directory.display(),
        workers,
        "Configuration loaded"
    );

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        mock: args.mock,
        max_anchors: args.max_anchors,
        workers,
    });

    if args.dry_run {
        let plan = pipeline.plan().context("Failed to build alignment plan")?;
        info!("Dry run mode - plan is valid, exiting");
        print_plan(&plan, args.max_anchors);
        return Ok(());
    }

    // Ctrl-C / SIGTERM only stop new anchors; in-flight ones still finish.
    let stop = pipeline.stop_flag();
    let signal_task = tokio::spawn(watch_shutdown_signal(Arc::clone(&stop)));

    info!("Starting pipeline...");
    let result = pipeline.run().await;
    signal_task.abort();

    let stats = result.context("Pipeline execution failed")?;
    if args.json {
        let json = serde_json::to_string_pretty(&stats).context("Failed to serialize run summary")?;
        println!("{json}");
    } else {
        stats.print_summary();
    }

    if stop.load(Ordering::Relaxed) {
        warn!("Run interrupted before all anchors were rendered");
    }
    Ok(())
}

/// Set `stop` on Ctrl+C or SIGTERM
async fn watch_shutdown_signal(stop: Arc<AtomicBool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    warn!("Received shutdown signal, finishing in-flight anchors");
    stop.store(true, Ordering::Relaxed);
}

/// Print the alignment plan for dry-run mode
fn print_plan(plan: &EngineSummary, max_anchors: Option<usize>) {
    let range = &plan.anchor_range;
    let planned = max_anchors.map_or(range.len(), |max| range.len().min(max));

    println!("\n=== Alignment Plan ===\n");
    println!("Streams:");
    println!("  Primary frames: {}", plan.primary_frames);
    println!("  Secondary frames: {}", plan.secondary_frames);
    println!("  Sensor samples: {}", plan.sensor_samples);
    println!("  Audio samples: {}", plan.audio_samples);
    println!("\nTiming channel:");
    println!("  Pulses: {}", plan.timing_anchors);
    println!("  Effective rate: {:.3} Hz", plan.timing_rate_hz);
    println!("  Max residual: {:.6} s", plan.timing_max_residual_s);
    println!("\nWindow:");
    println!("  Sizing: {}", plan.window_sizing);
    println!("  Half width: {:.6} s", plan.half_width_s);
    println!("\nScales:");
    println!("  Sensor: {:.6e}", plan.sensor_scale);
    println!("  Audio: {:.6e}", plan.audio_scale);
    if range.is_empty() {
        println!("\nAnchors: none");
    } else {
        println!(
            "\nAnchors: {}..={} ({} of {} planned)",
            range.start,
            range.end - 1,
            planned,
            range.len()
        );
    }
    println!();
}
