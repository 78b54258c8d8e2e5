//! Raw sample recordings
//!
//! A recording is a small JSON header next to a little-endian `f32` sample
//! file:
//!
//! ```json
//! {
//!   "sampling_rate": 1000.0,
//!   "channels": ["STI 006", "MEG 0111"],
//!   "data": "meg.f32",
//!   "layout": "channel_major",
//!   "start_time": 0.0,
//!   "timestamps": "meg.ts.f64"
//! }
//! ```
//!
//! Relative paths are resolved against the header's directory. The optional
//! `timestamps` file holds one little-endian `f64` per sample.

use std::path::{Path, PathBuf};

use contracts::{
    AudioRecording, ChannelData, ContractError, DenseStream, SensorRecording, StreamKind,
};
use serde::Deserialize;
use tracing::debug;

use crate::error::{IngestionError, Result};

/// Sample order in the data file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleLayout {
    /// All samples of channel 0, then channel 1, ...
    #[default]
    ChannelMajor,
    /// One sample of every channel per time step
    Interleaved,
}

#[derive(Debug, Deserialize)]
struct RecordingHeader {
    sampling_rate: f64,
    channels: Vec<String>,
    data: PathBuf,
    #[serde(default)]
    layout: SampleLayout,
    #[serde(default)]
    start_time: f64,
    #[serde(default)]
    timestamps: Option<PathBuf>,
}

/// Multi-channel sampled recording
///
/// Serves both as a [`SensorRecording`] (timing + signal channels) and as an
/// [`AudioRecording`] (channel plus per-sample timestamps).
#[derive(Debug, Clone)]
pub struct RawRecording {
    stream: StreamKind,
    sampling_rate: f64,
    start_time: f64,
    names: Vec<String>,
    channels: Vec<Vec<f64>>,
    timestamps: Option<Vec<f64>>,
}

impl RawRecording {
    /// Open a recording from its JSON header
    pub fn open(header_path: impl AsRef<Path>, stream: StreamKind) -> Result<Self> {
        let header_path = header_path.as_ref();
        let content = std::fs::read_to_string(header_path)
            .map_err(|e| IngestionError::read(header_path, e))?;
        let header: RecordingHeader = serde_json::from_str(&content)
            .map_err(|e| IngestionError::header(header_path, e.to_string()))?;

        if !(header.sampling_rate.is_finite() && header.sampling_rate > 0.0) {
            return Err(IngestionError::header(
                header_path,
                format!("sampling_rate must be > 0, got {}", header.sampling_rate),
            ));
        }
        if header.channels.is_empty() {
            return Err(IngestionError::header(header_path, "no channels declared"));
        }

        let base = header_path.parent().unwrap_or_else(|| Path::new("."));
        let data_path = base.join(&header.data);
        let raw = std::fs::read(&data_path).map_err(|e| IngestionError::read(&data_path, e))?;
        let samples = decode_f32_le(stream, &raw)?;
        let channels = split_channels(stream, samples, header.channels.len(), header.layout)?;

        let timestamps = match &header.timestamps {
            Some(file) => {
                let ts_path = base.join(file);
                let raw = std::fs::read(&ts_path).map_err(|e| IngestionError::read(&ts_path, e))?;
                Some(decode_f64_le(stream, &raw)?)
            }
            None => None,
        };

        let recording = Self::from_parts(
            stream,
            header.sampling_rate,
            header.start_time,
            header.channels.into_iter().zip(channels).collect(),
            timestamps,
        )?;

        debug!(
            stream = %stream,
            path = %header_path.display(),
            channels = recording.names.len(),
            samples = recording.samples_per_channel(),
            sampling_rate = recording.sampling_rate,
            "recording opened"
        );

        Ok(recording)
    }

    /// Build a recording from decoded channels
    pub fn from_parts(
        stream: StreamKind,
        sampling_rate: f64,
        start_time: f64,
        channels: Vec<(String, Vec<f64>)>,
        timestamps: Option<Vec<f64>>,
    ) -> std::result::Result<Self, ContractError> {
        let (names, channels): (Vec<_>, Vec<_>) = channels.into_iter().unzip();

        let per_channel = channels.first().map_or(0, Vec::len);
        if let Some(bad) = channels.iter().position(|c| c.len() != per_channel) {
            return Err(ContractError::length_mismatch(
                stream,
                format!(
                    "channel '{}' has {} samples, expected {per_channel}",
                    names[bad],
                    channels[bad].len()
                ),
            ));
        }
        if let Some(ts) = &timestamps {
            if ts.len() != per_channel {
                return Err(ContractError::length_mismatch(
                    stream,
                    format!("{} timestamps for {per_channel} samples per channel", ts.len()),
                ));
            }
        }

        Ok(Self {
            stream,
            sampling_rate,
            start_time,
            names,
            channels,
            timestamps,
        })
    }

    /// Nominal sampling rate (Hz)
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Samples in each channel
    pub fn samples_per_channel(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    fn position(&self, name: &str) -> std::result::Result<usize, ContractError> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ContractError::ChannelNotFound {
                stream: self.stream,
                channel: name.to_string(),
                available: self.names.clone(),
            })
    }

    fn sample_timestamps(&self) -> Vec<f64> {
        match &self.timestamps {
            Some(ts) => ts.clone(),
            None => (0..self.samples_per_channel())
                .map(|i| self.start_time + i as f64 / self.sampling_rate)
                .collect(),
        }
    }
}

impl SensorRecording for RawRecording {
    fn channel_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn channel(&self, name: &str) -> std::result::Result<ChannelData, ContractError> {
        let pos = self.position(name)?;
        Ok(ChannelData {
            name: name.to_string(),
            samples: self.channels[pos].clone(),
            sampling_rate: self.sampling_rate,
        })
    }
}

impl AudioRecording for RawRecording {
    fn channel_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn channel_stream(&self, name: &str) -> std::result::Result<DenseStream, ContractError> {
        let pos = self.position(name)?;
        DenseStream::new(self.stream, self.sample_timestamps(), self.channels[pos].clone())
    }
}

fn decode_f32_le(stream: StreamKind, raw: &[u8]) -> std::result::Result<Vec<f64>, ContractError> {
    if raw.len() % 4 != 0 {
        return Err(ContractError::length_mismatch(
            stream,
            format!("sample file of {} bytes is not a whole number of f32", raw.len()),
        ));
    }
    Ok(raw
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f64)
        .collect())
}

fn decode_f64_le(stream: StreamKind, raw: &[u8]) -> std::result::Result<Vec<f64>, ContractError> {
    if raw.len() % 8 != 0 {
        return Err(ContractError::length_mismatch(
            stream,
            format!("timestamp file of {} bytes is not a whole number of f64", raw.len()),
        ));
    }
    Ok(raw
        .chunks_exact(8)
        .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
        .collect())
}

fn split_channels(
    stream: StreamKind,
    samples: Vec<f64>,
    n_channels: usize,
    layout: SampleLayout,
) -> std::result::Result<Vec<Vec<f64>>, ContractError> {
    if samples.len() % n_channels != 0 {
        return Err(ContractError::length_mismatch(
            stream,
            format!(
                "{} samples do not divide into {n_channels} channels",
                samples.len()
            ),
        ));
    }
    let per_channel = samples.len() / n_channels;

    Ok(match layout {
        SampleLayout::ChannelMajor => samples
            .chunks(per_channel.max(1))
            .map(<[f64]>::to_vec)
            .chain(std::iter::repeat_with(Vec::new))
            .take(n_channels)
            .collect(),
        SampleLayout::Interleaved => (0..n_channels)
            .map(|c| samples.iter().skip(c).step_by(n_channels).copied().collect())
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_open_channel_major() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s.f32"), f32_bytes(&[0.0, 5.0, 5.0, 1.0, 2.0, 3.0]))
            .unwrap();
        std::fs::write(
            dir.path().join("s.json"),
            r#"{"sampling_rate": 10.0, "channels": ["STI 006", "MEG 0111"], "data": "s.f32"}"#,
        )
        .unwrap();

        let rec = RawRecording::open(dir.path().join("s.json"), StreamKind::Sensor).unwrap();
        let sti = SensorRecording::channel(&rec, "STI 006").unwrap();
        assert_eq!(sti.samples, vec![0.0, 5.0, 5.0]);
        assert_eq!(sti.sampling_rate, 10.0);
        let meg = SensorRecording::channel(&rec, "MEG 0111").unwrap();
        assert_eq!(meg.samples, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_open_interleaved_with_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.f32"), f32_bytes(&[0.5, -0.5, 0.25, -0.25])).unwrap();
        let ts: Vec<u8> = [10.0f64, 10.5].iter().flat_map(|v| v.to_le_bytes()).collect();
        std::fs::write(dir.path().join("a.ts"), ts).unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"{"sampling_rate": 2.0, "channels": ["left", "right"], "data": "a.f32",
                "layout": "interleaved", "timestamps": "a.ts"}"#,
        )
        .unwrap();

        let rec = RawRecording::open(dir.path().join("a.json"), StreamKind::Audio).unwrap();
        let right = rec.channel_stream("right").unwrap();
        assert_eq!(right.samples, vec![-0.5, -0.25]);
        assert_eq!(right.timestamps, vec![10.0, 10.5]);
    }

    #[test]
    fn test_synthesized_timestamps() {
        let rec = RawRecording::from_parts(
            StreamKind::Audio,
            4.0,
            1.0,
            vec![("left".into(), vec![0.0; 3])],
            None,
        )
        .unwrap();
        let stream = rec.channel_stream("left").unwrap();
        assert_eq!(stream.timestamps, vec![1.0, 1.25, 1.5]);
    }

    #[test]
    fn test_missing_channel_lists_available() {
        let rec = RawRecording::from_parts(
            StreamKind::Sensor,
            1.0,
            0.0,
            vec![("STI 006".into(), vec![0.0])],
            None,
        )
        .unwrap();
        let err = SensorRecording::channel(&rec, "STI 014").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("STI 014") && msg.contains("STI 006"), "got: {msg}");
    }

    #[test]
    fn test_indivisible_sample_count() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("s.f32"), f32_bytes(&[1.0, 2.0, 3.0])).unwrap();
        std::fs::write(
            dir.path().join("s.json"),
            r#"{"sampling_rate": 1.0, "channels": ["a", "b"], "data": "s.f32"}"#,
        )
        .unwrap();

        let err = RawRecording::open(dir.path().join("s.json"), StreamKind::Sensor).unwrap_err();
        assert!(matches!(
            err,
            IngestionError::Contract(ContractError::StreamLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_timestamp_length_mismatch() {
        let err = RawRecording::from_parts(
            StreamKind::Audio,
            1.0,
            0.0,
            vec![("left".into(), vec![0.0, 1.0])],
            Some(vec![0.0]),
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::StreamLengthMismatch { .. }));
    }

    #[test]
    fn test_rejects_zero_sampling_rate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("s.json"),
            r#"{"sampling_rate": 0.0, "channels": ["a"], "data": "s.f32"}"#,
        )
        .unwrap();
        let err = RawRecording::open(dir.path().join("s.json"), StreamKind::Sensor).unwrap_err();
        assert!(matches!(err, IngestionError::Header { .. }));
    }
}
