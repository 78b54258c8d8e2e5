//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{RunBlueprint, WindowSizingConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Outcome of `validate`, printed as text or JSON
#[derive(Serialize)]
struct ValidationReport {
    config_path: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    signal_channel: String,
    audio_channel: String,
    composite_width: u32,
    composite_height: u32,
    output_directory: String,
}

impl ConfigSummary {
    fn new(blueprint: &RunBlueprint) -> Self {
        let (composite_width, composite_height) =
            compositor::TileSize::from(&blueprint.layout).composite();
        Self {
            version: format!("{:?}", blueprint.version),
            signal_channel: blueprint.channels.signal.clone(),
            audio_channel: blueprint.channels.audio.clone(),
            composite_width,
            composite_height,
            output_directory: blueprint.output.directory.display().to_string(),
        }
    }
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let report = check(args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("Failed to serialize validation report")?;
        println!("{json}");
    } else {
        report.print();
    }

    anyhow::ensure!(report.valid, "Configuration validation failed");
    Ok(())
}

fn check(args: &ValidateArgs) -> ValidationReport {
    let loaded = if args.config.exists() {
        config_loader::ConfigLoader::load_from_path(&args.config).map_err(|e| e.to_string())
    } else {
        Err(format!("File not found: {}", args.config.display()))
    };

    let mut report = ValidationReport {
        config_path: args.config.display().to_string(),
        valid: loaded.is_ok(),
        error: None,
        warnings: Vec::new(),
        summary: None,
    };
    match loaded {
        Ok(blueprint) => {
            report.warnings = collect_warnings(&blueprint);
            report.summary = Some(ConfigSummary::new(&blueprint));
        }
        Err(message) => report.error = Some(message),
    }
    report
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &RunBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();
    let sources = &blueprint.sources;

    if sources.primary_video == sources.secondary_video {
        warnings.push(
            "sources.primary_video and sources.secondary_video are the same - \
             composites will compare a video with itself"
                .to_string(),
        );
    }

    for (field, path) in [
        ("sources.primary_video", &sources.primary_video),
        ("sources.secondary_video", &sources.secondary_video),
        ("sources.audio", &sources.audio),
        ("sources.sensor", &sources.sensor),
    ] {
        if !path.exists() {
            warnings.push(format!("{field} does not exist: {}", path.display()));
        }
    }

    if let WindowSizingConfig::Fixed { half_width_s } = blueprint.window.sizing {
        warnings.push(format!(
            "window.sizing is fixed ({half_width_s} s) - the window no longer follows frame spacing"
        ));
    }

    if blueprint.timing.max_residual_s == 0.0 {
        warnings.push("timing.max_residual_s is 0 - timing fit residuals are not checked".to_string());
    }

    if blueprint.output.directory.exists() {
        warnings.push(format!(
            "output.directory {} exists - composites with the same name will be replaced",
            blueprint.output.directory.display()
        ));
    }

    warnings
}

impl ValidationReport {
    fn print(&self) {
        if !self.valid {
            println!("✗ {} is invalid", self.config_path);
            if let Some(error) = &self.error {
                println!("  {error}");
            }
            return;
        }

        println!("✓ {} is valid", self.config_path);
        if let Some(summary) = &self.summary {
            println!("\n  Config version:  {}", summary.version);
            println!("  Signal channel:  {}", summary.signal_channel);
            println!("  Audio channel:   {}", summary.audio_channel);
            println!(
                "  Composite size:  {}x{}",
                summary.composite_width, summary.composite_height
            );
            println!("  Output:          {}", summary.output_directory);
        }
        if !self.warnings.is_empty() {
            println!("\n⚠ {} warning(s):", self.warnings.len());
            for warning in &self.warnings {
                println!("  - {warning}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    fn blueprint(extra: &str) -> RunBlueprint {
        let toml = format!(
            r#"
[sources]
primary_video = "cam"
secondary_video = "cam"
audio = "audio.json"
sensor = "meg.json"

[channels]
timing = "STI 006"
signal = "MEG 0111"
audio = "left"

[output]
directory = "does/not/exist/out"
{extra}
"#
        );
        ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
    }

    #[test]
    fn test_identical_sources_warned() {
        let warnings = collect_warnings(&blueprint(""));
        assert!(warnings.iter().any(|w| w.contains("are the same")));
        assert!(!warnings.iter().any(|w| w.contains("window.sizing")));
    }

    #[test]
    fn test_fixed_sizing_warned() {
        let warnings = collect_warnings(&blueprint(
            "\n[window]\nsizing = { kind = \"fixed\", half_width_s = 0.5 }\n",
        ));
        assert!(warnings.iter().any(|w| w.contains("window.sizing is fixed")));
    }
}
