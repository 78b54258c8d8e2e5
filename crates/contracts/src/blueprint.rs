//! RunBlueprint - Config Loader output
//!
//! Describes one inspection run: where the four streams live, which
//! channels to use, how the window and amplitude scales are derived,
//! composite geometry and where images go.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunBlueprint {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Input locations
    pub sources: SourcesConfig,

    /// Named channel selection
    pub channels: ChannelsConfig,

    /// Timing channel decoding
    #[serde(default)]
    pub timing: TimingConfig,

    /// Composite geometry
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Alignment window policy
    #[serde(default)]
    pub window: WindowSettings,

    /// Amplitude scaling
    #[serde(default)]
    pub scaling: ScalingConfig,

    /// Output routing
    pub output: OutputConfig,

    /// Execution settings
    #[serde(default)]
    pub run: RunSettings,
}

/// Input locations for the four streams
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Frame store directory of the anchor (primary) video
    pub primary_video: PathBuf,

    /// Frame store directory of the compared (secondary) video
    pub secondary_video: PathBuf,

    /// Raw audio recording header (JSON)
    pub audio: PathBuf,

    /// Raw sensor recording header (JSON)
    pub sensor: PathBuf,
}

/// Explicit channel names, no positional selection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsConfig {
    /// Digital timing channel in the sensor recording (e.g. "STI 006")
    pub timing: String,

    /// Signal channel to plot from the sensor recording
    pub signal: String,

    /// Audio channel to plot
    pub audio: String,
}

/// Timing channel decoding parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pulse decoder
    #[serde(default)]
    pub decoder: TimingDecoderConfig,

    /// Allowed backwards step between consecutive decoded pulse times (seconds)
    #[serde(default = "default_timing_tolerance")]
    pub tolerance_s: f64,

    /// Largest allowed deviation of a pulse from the fitted clock (seconds, 0 = off)
    #[serde(default = "default_max_residual")]
    pub max_residual_s: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            decoder: TimingDecoderConfig::default(),
            tolerance_s: default_timing_tolerance(),
            max_residual_s: default_max_residual(),
        }
    }
}

fn default_timing_tolerance() -> f64 {
    0.001
}

fn default_max_residual() -> f64 {
    0.005
}

/// Available pulse decoders
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimingDecoderConfig {
    /// Every rising edge is one tick of a pulse clock
    RisingEdge {
        /// Pulse period (seconds)
        period_s: f64,

        /// Time of the first detected edge (seconds)
        #[serde(default)]
        origin_s: f64,

        /// Edge threshold; midpoint of the channel range when absent
        #[serde(default)]
        threshold: Option<f64>,
    },
}

impl Default for TimingDecoderConfig {
    fn default() -> Self {
        Self::RisingEdge {
            period_s: 1.0,
            origin_s: 0.0,
            threshold: None,
        }
    }
}

/// Composite geometry
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Frame tile width (pixels)
    #[serde(default = "default_tile_width")]
    pub tile_width: u32,

    /// Frame tile height (pixels)
    #[serde(default = "default_tile_height")]
    pub tile_height: u32,

    /// Trace panel resolution, converts stroke widths from points to pixels
    #[serde(default = "default_dpi")]
    pub dpi: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tile_width: default_tile_width(),
            tile_height: default_tile_height(),
            dpi: default_dpi(),
        }
    }
}

fn default_tile_width() -> u32 {
    640
}

fn default_tile_height() -> u32 {
    480
}

fn default_dpi() -> f64 {
    80.0
}

/// Window policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowSettings {
    /// Window width in primary frames; also bounds the anchor range
    #[serde(default = "default_width_frames")]
    pub width_frames: f64,

    /// Half-width strategy
    #[serde(default)]
    pub sizing: WindowSizingConfig,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            width_frames: default_width_frames(),
            sizing: WindowSizingConfig::default(),
        }
    }
}

fn default_width_frames() -> f64 {
    3.0
}

/// How the global half-width is derived
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowSizingConfig {
    /// `max primary gap × (width_frames + 0.1)`
    #[default]
    MaxGap,
    /// Constant half-width in seconds
    Fixed { half_width_s: f64 },
}

/// Percentile-based amplitude scaling
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScalingConfig {
    /// Percentile of |signal| mapped near full scale, in (0, 100]
    #[serde(default = "default_percentile")]
    pub signal_percentile: f64,

    /// Percentile of |audio| mapped near full scale, in (0, 100]
    #[serde(default = "default_percentile")]
    pub audio_percentile: f64,

    /// Headroom multiplier applied to the percentile value
    #[serde(default = "default_margin")]
    pub margin: f64,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            signal_percentile: default_percentile(),
            audio_percentile: default_percentile(),
            margin: default_margin(),
        }
    }
}

fn default_percentile() -> f64 {
    99.99
}

fn default_margin() -> f64 {
    1.1
}

/// Output routing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one PNG per anchor
    pub directory: PathBuf,

    /// File name prefix, files are `<prefix>-<anchor:07>.png`
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,

    /// Also report every composite through the log sink
    #[serde(default)]
    pub log_sink: bool,

    /// Queue capacity per sink
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_file_prefix() -> String {
    "frame".to_string()
}

fn default_queue_capacity() -> usize {
    16
}

/// Execution settings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RunSettings {
    /// Concurrent anchor workers (0 = available parallelism)
    #[serde(default)]
    pub workers: usize,
}
