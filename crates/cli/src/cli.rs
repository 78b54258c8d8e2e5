//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// syncview - Multi-stream alignment inspection
#[derive(Parser, Debug)]
#[command(
    name = "syncview",
    author,
    version,
    about = "Render alignment composites for two videos, a sensor recording and audio",
    long_about = "Renders one composite image per primary video frame: the three nearest \n\
                  primary and secondary frames side by side above the sensor and audio \n\
                  traces of a window around the frame, with tick marks at every frame \n\
                  timestamp. Misaligned streams show up as ticks that drift apart."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "SYNCVIEW_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "compact",
        global = true,
        env = "SYNCVIEW_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Render composites for every anchor
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(short, long, default_value = "syncview.toml", env = "SYNCVIEW_CONFIG")]
    pub config: PathBuf,

    /// Use a generated in-memory data set instead of the configured sources
    #[arg(long)]
    pub mock: bool,

    /// Render at most this many anchors
    #[arg(long, env = "SYNCVIEW_MAX_ANCHORS")]
    pub max_anchors: Option<usize>,

    /// Build the alignment plan and print it without rendering
    #[arg(long)]
    pub dry_run: bool,

    /// Override the output directory from configuration
    #[arg(short, long, env = "SYNCVIEW_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Override the number of concurrent anchor workers (0 = all cores)
    #[arg(short, long, env = "SYNCVIEW_WORKERS")]
    pub workers: Option<usize>,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "syncview.toml", env = "SYNCVIEW_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "syncview.toml", env = "SYNCVIEW_CONFIG")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    #[default]
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_args() {
        let cli = Cli::parse_from([
            "syncview",
            "run",
            "--config",
            "run.toml",
            "--mock",
            "--max-anchors",
            "5",
            "--workers",
            "2",
        ]);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.mock);
                assert_eq!(args.max_anchors, Some(5));
                assert_eq!(args.workers, Some(2));
                assert_eq!(args.config, PathBuf::from("run.toml"));
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["syncview", "-q", "-v", "info"]).is_err());
    }
}
