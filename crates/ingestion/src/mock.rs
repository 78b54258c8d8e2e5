//! Synthetic data set
//!
//! Deterministic stand-in for the four recordings, used by `run --mock` and
//! by tests. Video frames are small PNGs, audio is a pair of sines and the
//! sensor recording carries a square-wave timing channel whose rising edges
//! follow the configured pulse period and origin.

use std::io::Cursor;

use bytes::Bytes;
use contracts::{ContractError, RunBlueprint, StreamKind, TimingDecoderConfig};
use image::{ImageFormat, Rgb, RgbImage};
use tracing::debug;

use crate::frame_store::MemoryFrameStore;
use crate::recording::RawRecording;

/// Synthetic data set configuration
#[derive(Debug, Clone)]
pub struct MockDatasetConfig {
    /// Primary video frame timestamps
    pub primary_timestamps: Vec<f64>,

    /// Secondary video frame timestamps
    pub secondary_timestamps: Vec<f64>,

    /// Frame width (pixels)
    pub tile_width: u32,

    /// Frame height (pixels)
    pub tile_height: u32,

    /// Nominal sensor sampling rate (Hz), rounded to a whole number of
    /// samples per timing pulse
    pub sensor_rate: f64,

    /// Audio sampling rate (Hz)
    pub audio_rate: f64,

    /// Timing pulse period (seconds)
    pub timing_period_s: f64,

    /// Time of the first timing pulse (seconds)
    pub timing_origin_s: f64,

    /// Timing channel name
    pub timing_channel: String,

    /// Signal channel name
    pub signal_channel: String,

    /// Audio channel name
    pub audio_channel: String,

    /// Time span covered by the sensor and audio recordings; defaults to
    /// the video span padded by 5 s on both sides
    pub signal_span: Option<(f64, f64)>,

    /// Primary frame indices whose encoded bytes are garbage
    pub corrupt_primary_frames: Vec<usize>,
}

impl Default for MockDatasetConfig {
    fn default() -> Self {
        Self::uniform(60, 30.0)
    }
}

impl MockDatasetConfig {
    /// `frames` primary frames at `fps`, secondary offset by a fifth of a frame
    pub fn uniform(frames: usize, fps: f64) -> Self {
        let primary: Vec<f64> = (0..frames).map(|i| i as f64 / fps).collect();
        let secondary = primary.iter().map(|t| t + 0.2 / fps).collect();
        Self {
            primary_timestamps: primary,
            secondary_timestamps: secondary,
            tile_width: 64,
            tile_height: 48,
            sensor_rate: 100.0,
            audio_rate: 1000.0,
            timing_period_s: 1.0,
            timing_origin_s: 0.0,
            timing_channel: "STI 006".to_string(),
            signal_channel: "MEG 0111".to_string(),
            audio_channel: "left".to_string(),
            signal_span: None,
            corrupt_primary_frames: Vec::new(),
        }
    }

    /// Match channel names, tile size and pulse clock of a run configuration
    pub fn from_blueprint(blueprint: &RunBlueprint) -> Self {
        let TimingDecoderConfig::RisingEdge {
            period_s, origin_s, ..
        } = blueprint.timing.decoder;

        Self {
            tile_width: blueprint.layout.tile_width,
            tile_height: blueprint.layout.tile_height,
            timing_period_s: period_s,
            timing_origin_s: origin_s,
            timing_channel: blueprint.channels.timing.clone(),
            signal_channel: blueprint.channels.signal.clone(),
            audio_channel: blueprint.channels.audio.clone(),
            ..Self::default()
        }
    }

    /// Timing decoder that reproduces the generated pulse clock
    pub fn timing_decoder(&self) -> TimingDecoderConfig {
        TimingDecoderConfig::RisingEdge {
            period_s: self.timing_period_s,
            origin_s: self.timing_origin_s,
            threshold: None,
        }
    }

    fn span(&self) -> (f64, f64) {
        self.signal_span.unwrap_or_else(|| {
            let all = self
                .primary_timestamps
                .iter()
                .chain(&self.secondary_timestamps)
                .copied();
            let (lo, hi) = all.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                (lo.min(t), hi.max(t))
            });
            if lo.is_finite() {
                (lo - 5.0, hi + 5.0)
            } else {
                (0.0, 10.0)
            }
        })
    }
}

/// Generated streams
#[derive(Debug, Clone)]
pub struct MockDataset {
    pub primary: MemoryFrameStore,
    pub secondary: MemoryFrameStore,
    pub audio: RawRecording,
    pub sensor: RawRecording,
}

impl MockDataset {
    /// Generate all four streams
    pub fn generate(config: &MockDatasetConfig) -> Result<Self, ContractError> {
        let primary = video_stream(StreamKind::PrimaryVideo, config, &config.primary_timestamps)?;
        let secondary =
            video_stream(StreamKind::SecondaryVideo, config, &config.secondary_timestamps)?;
        let audio = audio_recording(config)?;
        let sensor = sensor_recording(config)?;

        debug!(
            primary = config.primary_timestamps.len(),
            secondary = config.secondary_timestamps.len(),
            audio_samples = audio.samples_per_channel(),
            sensor_samples = sensor.samples_per_channel(),
            "mock data set generated"
        );

        Ok(Self {
            primary,
            secondary,
            audio,
            sensor,
        })
    }
}

fn video_stream(
    stream: StreamKind,
    config: &MockDatasetConfig,
    timestamps: &[f64],
) -> Result<MemoryFrameStore, ContractError> {
    let mut store = MemoryFrameStore::empty(stream);
    for (index, &ts) in timestamps.iter().enumerate() {
        let data = if stream == StreamKind::PrimaryVideo
            && config.corrupt_primary_frames.contains(&index)
        {
            Bytes::from_static(b"not an image")
        } else {
            encode_frame(stream, index, config.tile_width, config.tile_height)?
        };
        store.push(ts, data);
    }
    Ok(store)
}

/// Solid background per stream with a marker bar that moves with the index
fn encode_frame(
    stream: StreamKind,
    index: usize,
    width: u32,
    height: u32,
) -> Result<Bytes, ContractError> {
    let base = match stream {
        StreamKind::SecondaryVideo => Rgb([40, 90, 160]),
        _ => Rgb([160, 90, 40]),
    };
    let bar_x = (index as u32 * 7) % width.max(1);
    let img = RgbImage::from_fn(width, height, |x, _| {
        if x.abs_diff(bar_x) <= 1 {
            Rgb([255, 255, 255])
        } else {
            base
        }
    });

    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| ContractError::Other(format!("mock frame encode failed: {e}")))?;
    Ok(Bytes::from(buf.into_inner()))
}

fn audio_recording(config: &MockDatasetConfig) -> Result<RawRecording, ContractError> {
    let (lo, hi) = config.span();
    let n = ((hi - lo) * config.audio_rate).max(0.0) as usize;
    let t = |i: usize| lo + i as f64 / config.audio_rate;

    let left = (0..n)
        .map(|i| 0.8 * (std::f64::consts::TAU * 5.0 * t(i)).sin())
        .collect();
    let right = (0..n)
        .map(|i| 0.3 * (std::f64::consts::TAU * 11.0 * t(i)).sin())
        .collect();

    // Keep the configured channel first, the other one is never plotted.
    let other = if config.audio_channel == "right" {
        "left"
    } else {
        "right"
    };
    RawRecording::from_parts(
        StreamKind::Audio,
        config.audio_rate,
        lo,
        vec![
            (config.audio_channel.clone(), left),
            (other.to_string(), right),
        ],
        None,
    )
}

fn sensor_recording(config: &MockDatasetConfig) -> Result<RawRecording, ContractError> {
    let samples_per_pulse = (config.timing_period_s * config.sensor_rate).round().max(2.0) as usize;
    let rate = samples_per_pulse as f64 / config.timing_period_s;

    let (lo, hi) = config.span();
    // At least one low sample before the first edge.
    let start = lo.min(config.timing_origin_s - 1.0 / rate);
    let first_edge = ((config.timing_origin_s - start) * rate).round() as usize;
    let n = ((hi - start) * rate).max(0.0) as usize;

    let timing = (0..n)
        .map(|i| {
            if i >= first_edge && (i - first_edge) % samples_per_pulse < samples_per_pulse / 2 {
                5.0
            } else {
                0.0
            }
        })
        .collect();
    let signal = (0..n)
        .map(|i| {
            let t = start + i as f64 / rate;
            1e-12
                * ((std::f64::consts::TAU * 1.1 * t).sin()
                    + 0.3 * (std::f64::consts::TAU * 7.0 * t).sin())
        })
        .collect();

    RawRecording::from_parts(
        StreamKind::Sensor,
        rate,
        start,
        vec![
            (config.timing_channel.clone(), timing),
            (config.signal_channel.clone(), signal),
        ],
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{AudioRecording, FrameStore, SensorRecording};

    #[test]
    fn test_generate_uniform() {
        let config = MockDatasetConfig::uniform(10, 1.0);
        let data = MockDataset::generate(&config).unwrap();

        assert_eq!(data.primary.len(), 10);
        assert_eq!(data.secondary.timestamps()[0], 0.2);

        let frame = data.primary.frame(3).unwrap();
        let img = image::load_from_memory(&frame.data).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
    }

    #[test]
    fn test_timing_channel_edges_follow_clock() {
        let config = MockDatasetConfig::uniform(10, 1.0);
        let data = MockDataset::generate(&config).unwrap();

        let sti = SensorRecording::channel(&data.sensor, "STI 006").unwrap();
        let edges: Vec<usize> = sti
            .samples
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] < 2.5 && w[1] >= 2.5)
            .map(|(i, _)| i + 1)
            .collect();
        assert!(edges.len() > 10);
        // one pulse per second at 100 Hz
        assert!(edges.windows(2).all(|w| w[1] - w[0] == 100));
    }

    #[test]
    fn test_signal_span_limits_samples() {
        let mut config = MockDatasetConfig::uniform(20, 1.0);
        config.signal_span = Some((0.0, 8.0));
        let data = MockDataset::generate(&config).unwrap();

        let audio = data.audio.channel_stream("left").unwrap();
        let last = audio.timestamps.last().copied().unwrap();
        assert!(last < 8.0);
    }

    #[test]
    fn test_corrupt_frames() {
        let mut config = MockDatasetConfig::uniform(5, 1.0);
        config.corrupt_primary_frames = vec![2];
        let data = MockDataset::generate(&config).unwrap();

        let frame = data.primary.frame(2).unwrap();
        assert!(image::load_from_memory(&frame.data).is_err());
    }
}
