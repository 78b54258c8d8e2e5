//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{RunBlueprint, TimingDecoderConfig, WindowSizingConfig};
use serde::Serialize;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    sources: SourcesInfo,
    channels: ChannelsInfo,
    timing: TimingInfo,
    window: WindowInfo,
    scaling: ScalingInfo,
    layout: LayoutInfo,
    output: OutputInfo,
    workers: usize,
}

#[derive(Serialize)]
struct SourcesInfo {
    primary_video: String,
    secondary_video: String,
    audio: String,
    sensor: String,
}

#[derive(Serialize)]
struct ChannelsInfo {
    timing: String,
    signal: String,
    audio: String,
}

#[derive(Serialize)]
struct TimingInfo {
    decoder: String,
    period_s: f64,
    origin_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    threshold: Option<f64>,
    tolerance_s: f64,
    max_residual_s: f64,
}

#[derive(Serialize)]
struct WindowInfo {
    width_frames: f64,
    sizing: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    half_width_s: Option<f64>,
}

#[derive(Serialize)]
struct ScalingInfo {
    signal_percentile: f64,
    audio_percentile: f64,
    margin: f64,
}

#[derive(Serialize)]
struct LayoutInfo {
    tile_width: u32,
    tile_height: u32,
    dpi: f64,
    composite_width: u32,
    composite_height: u32,
    trace_panel_height: u32,
}

#[derive(Serialize)]
struct OutputInfo {
    directory: String,
    file_prefix: String,
    log_sink: bool,
    queue_capacity: usize,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = load_blueprint(&args.config)?;
    let info = build_config_info(&blueprint);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &RunBlueprint) -> ConfigInfo {
    let TimingDecoderConfig::RisingEdge {
        period_s,
        origin_s,
        threshold,
    } = blueprint.timing.decoder;
    let (sizing, half_width_s) = match blueprint.window.sizing {
        WindowSizingConfig::MaxGap => ("max_gap", None),
        WindowSizingConfig::Fixed { half_width_s } => ("fixed", Some(half_width_s)),
    };
    let tile = compositor::TileSize::from(&blueprint.layout);
    let (composite_width, composite_height) = tile.composite();
    let path = |p: &std::path::Path| p.display().to_string();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        sources: SourcesInfo {
            primary_video: path(&blueprint.sources.primary_video),
            secondary_video: path(&blueprint.sources.secondary_video),
            audio: path(&blueprint.sources.audio),
            sensor: path(&blueprint.sources.sensor),
        },
        channels: ChannelsInfo {
            timing: blueprint.channels.timing.clone(),
            signal: blueprint.channels.signal.clone(),
            audio: blueprint.channels.audio.clone(),
        },
        timing: TimingInfo {
            decoder: "rising_edge".to_string(),
            period_s,
            origin_s,
            threshold,
            tolerance_s: blueprint.timing.tolerance_s,
            max_residual_s: blueprint.timing.max_residual_s,
        },
        window: WindowInfo {
            width_frames: blueprint.window.width_frames,
            sizing: sizing.to_string(),
            half_width_s,
        },
        scaling: ScalingInfo {
            signal_percentile: blueprint.scaling.signal_percentile,
            audio_percentile: blueprint.scaling.audio_percentile,
            margin: blueprint.scaling.margin,
        },
        layout: LayoutInfo {
            tile_width: blueprint.layout.tile_width,
            tile_height: blueprint.layout.tile_height,
            dpi: blueprint.layout.dpi,
            composite_width,
            composite_height,
            trace_panel_height: tile.trace_panel().1,
        },
        output: OutputInfo {
            directory: path(&blueprint.output.directory),
            file_prefix: blueprint.output.file_prefix.clone(),
            log_sink: blueprint.output.log_sink,
            queue_capacity: blueprint.output.queue_capacity,
        },
        workers: blueprint.run.workers,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== Configuration ({}) ===\n", info.version);

    println!("Sources:");
    println!("  Primary video: {}", info.sources.primary_video);
    println!("  Secondary video: {}", info.sources.secondary_video);
    println!("  Audio: {}", info.sources.audio);
    println!("  Sensor: {}", info.sources.sensor);

    println!("\nChannels:");
    println!("  Timing: {}", info.channels.timing);
    println!("  Signal: {}", info.channels.signal);
    println!("  Audio: {}", info.channels.audio);

    println!("\nTiming ({}):", info.timing.decoder);
    println!("  Period: {} s, origin: {} s", info.timing.period_s, info.timing.origin_s);
    match info.timing.threshold {
        Some(t) => println!("  Threshold: {t}"),
        None => println!("  Threshold: channel midpoint"),
    }
    println!(
        "  Tolerance: {} s, max residual: {} s",
        info.timing.tolerance_s, info.timing.max_residual_s
    );

    println!("\nWindow:");
    println!("  Width: {} frames", info.window.width_frames);
    match info.window.half_width_s {
        Some(hw) => println!("  Sizing: {} ({hw} s)", info.window.sizing),
        None => println!("  Sizing: {}", info.window.sizing),
    }

    println!("\nScaling:");
    println!(
        "  Percentiles: signal {}, audio {}",
        info.scaling.signal_percentile, info.scaling.audio_percentile
    );
    println!("  Margin: {}", info.scaling.margin);

    println!("\nLayout:");
    println!(
        "  Tiles: {}x{} @ {} dpi",
        info.layout.tile_width, info.layout.tile_height, info.layout.dpi
    );
    println!(
        "  Composite: {}x{} (trace panel {} px high)",
        info.layout.composite_width, info.layout.composite_height, info.layout.trace_panel_height
    );

    println!("\nOutput:");
    println!("  Directory: {}", info.output.directory);
    println!("  Files: {}-<anchor>.png", info.output.file_prefix);
    println!("  Log sink: {}", info.output.log_sink);
    if info.workers == 0 {
        println!("  Workers: all cores");
    } else {
        println!("  Workers: {}", info.workers);
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_build_config_info() {
        let blueprint = ConfigLoader::load_from_str(
            r#"
[sources]
primary_video = "cam1"
secondary_video = "cam2"
audio = "audio.json"
sensor = "meg.json"

[channels]
timing = "STI 006"
signal = "MEG 0111"
audio = "left"

[output]
directory = "out"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let info = build_config_info(&blueprint);
        assert_eq!(info.layout.composite_width, 1920);
        assert_eq!(info.layout.composite_height, 1280);
        assert_eq!(info.window.sizing, "max_gap");
        assert_eq!(info.timing.decoder, "rising_edge");
        assert!(serde_json::to_string(&info).is_ok());
    }
}
