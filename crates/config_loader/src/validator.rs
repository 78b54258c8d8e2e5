//! Config validation
//!
//! Rules:
//! - source paths and channel names non-empty
//! - percentiles in (0, 100], margin > 0
//! - tile dimensions > 0, tile_height >= 3 (non-empty trace panel), dpi > 0
//! - width_frames finite and >= 0, fixed half-width > 0
//! - timing decoder period > 0, tolerances >= 0
//! - output directory and prefix non-empty

use contracts::{ContractError, RunBlueprint, TimingDecoderConfig, WindowSizingConfig};

/// Validate a RunBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    validate_sources(blueprint)?;
    validate_channels(blueprint)?;
    validate_timing(blueprint)?;
    validate_layout(blueprint)?;
    validate_window(blueprint)?;
    validate_scaling(blueprint)?;
    validate_output(blueprint)?;
    Ok(())
}

fn validate_sources(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let sources = &blueprint.sources;
    let entries = [
        ("sources.primary_video", &sources.primary_video),
        ("sources.secondary_video", &sources.secondary_video),
        ("sources.audio", &sources.audio),
        ("sources.sensor", &sources.sensor),
    ];
    for (field, path) in entries {
        if path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                field,
                "source path cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_channels(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let channels = &blueprint.channels;
    let entries = [
        ("channels.timing", &channels.timing),
        ("channels.signal", &channels.signal),
        ("channels.audio", &channels.audio),
    ];
    for (field, name) in entries {
        if name.trim().is_empty() {
            return Err(ContractError::config_validation(
                field,
                "channel name cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_timing(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let timing = &blueprint.timing;

    match timing.decoder {
        TimingDecoderConfig::RisingEdge {
            period_s,
            origin_s,
            threshold,
        } => {
            if !(period_s.is_finite() && period_s > 0.0) {
                return Err(ContractError::config_validation(
                    "timing.decoder.period_s",
                    format!("period_s must be > 0, got {period_s}"),
                ));
            }
            if !origin_s.is_finite() {
                return Err(ContractError::config_validation(
                    "timing.decoder.origin_s",
                    "origin_s must be finite",
                ));
            }
            if threshold.is_some_and(|t| !t.is_finite()) {
                return Err(ContractError::config_validation(
                    "timing.decoder.threshold",
                    "threshold must be finite",
                ));
            }
        }
    }

    if !(timing.tolerance_s.is_finite() && timing.tolerance_s >= 0.0) {
        return Err(ContractError::config_validation(
            "timing.tolerance_s",
            format!("tolerance_s must be >= 0, got {}", timing.tolerance_s),
        ));
    }
    if !(timing.max_residual_s.is_finite() && timing.max_residual_s >= 0.0) {
        return Err(ContractError::config_validation(
            "timing.max_residual_s",
            format!("max_residual_s must be >= 0, got {}", timing.max_residual_s),
        ));
    }
    Ok(())
}

fn validate_layout(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let layout = &blueprint.layout;

    if layout.tile_width == 0 {
        return Err(ContractError::config_validation(
            "layout.tile_width",
            "tile_width must be > 0",
        ));
    }
    // trace panel is 2h/3 high
    if layout.tile_height < 3 {
        return Err(ContractError::config_validation(
            "layout.tile_height",
            format!("tile_height must be >= 3, got {}", layout.tile_height),
        ));
    }
    if !(layout.dpi.is_finite() && layout.dpi > 0.0) {
        return Err(ContractError::config_validation(
            "layout.dpi",
            format!("dpi must be > 0, got {}", layout.dpi),
        ));
    }
    Ok(())
}

fn validate_window(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let window = &blueprint.window;

    if !(window.width_frames.is_finite() && window.width_frames >= 0.0) {
        return Err(ContractError::config_validation(
            "window.width_frames",
            format!("width_frames must be >= 0, got {}", window.width_frames),
        ));
    }

    if let WindowSizingConfig::Fixed { half_width_s } = window.sizing {
        if !(half_width_s.is_finite() && half_width_s > 0.0) {
            return Err(ContractError::config_validation(
                "window.sizing.half_width_s",
                format!("half_width_s must be > 0, got {half_width_s}"),
            ));
        }
    }
    Ok(())
}

fn validate_scaling(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let scaling = &blueprint.scaling;

    for (field, value) in [
        ("scaling.signal_percentile", scaling.signal_percentile),
        ("scaling.audio_percentile", scaling.audio_percentile),
    ] {
        if !(value > 0.0 && value <= 100.0) {
            return Err(ContractError::config_validation(
                field,
                format!("percentile must be in (0, 100], got {value}"),
            ));
        }
    }

    if !(scaling.margin.is_finite() && scaling.margin > 0.0) {
        return Err(ContractError::config_validation(
            "scaling.margin",
            format!("margin must be > 0, got {}", scaling.margin),
        ));
    }
    Ok(())
}

fn validate_output(blueprint: &RunBlueprint) -> Result<(), ContractError> {
    let output = &blueprint.output;

    if output.directory.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "output.directory",
            "output directory cannot be empty",
        ));
    }
    if output.file_prefix.is_empty() || output.file_prefix.contains(['/', '\\']) {
        return Err(ContractError::config_validation(
            "output.file_prefix",
            "file_prefix must be a non-empty file name component",
        ));
    }
    if output.queue_capacity == 0 {
        return Err(ContractError::config_validation(
            "output.queue_capacity",
            "queue_capacity must be > 0",
        ));
    }
    Ok(())
}
