//! Stream collaborators
//!
//! Read-only interfaces over the four recordings that get aligned: two
//! indexed video streams and two dense-sample streams. Time is always
//! `f64` seconds on the common clock.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Which of the four fixed streams a value belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    PrimaryVideo,
    SecondaryVideo,
    Audio,
    Sensor,
}

impl StreamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryVideo => "primary video",
            Self::SecondaryVideo => "secondary video",
            Self::Audio => "audio",
            Self::Sensor => "sensor",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One encoded video frame as handed out by a [`FrameStore`]
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    /// Index into the store
    pub index: usize,

    /// Capture time (seconds)
    pub timestamp: f64,

    /// Encoded image blob (PNG/JPEG/...)
    pub data: Bytes,
}

/// Indexed video stream
///
/// Implementations must tolerate concurrent reads: anchors are rendered
/// from several worker threads sharing one store.
pub trait FrameStore: Send + Sync {
    /// Number of frames
    fn len(&self) -> usize;

    /// Whether the store holds no frames
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-frame timestamps, one per index
    fn timestamps(&self) -> &[f64];

    /// Fetch the encoded frame at `index`
    fn frame(&self, index: usize) -> Result<EncodedFrame, ContractError>;
}

/// A single named channel of a sampled recording
#[derive(Debug, Clone)]
pub struct ChannelData {
    /// Channel name
    pub name: String,

    /// Samples in acquisition order
    pub samples: Vec<f64>,

    /// Nominal sampling rate (Hz)
    pub sampling_rate: f64,
}

/// Dense-sample stream with one timestamp per sample
#[derive(Debug, Clone, Default)]
pub struct DenseStream {
    pub timestamps: Vec<f64>,
    pub samples: Vec<f64>,
}

impl DenseStream {
    /// Pair timestamps and samples, checking they line up
    pub fn new(
        stream: StreamKind,
        timestamps: Vec<f64>,
        samples: Vec<f64>,
    ) -> Result<Self, ContractError> {
        if timestamps.len() != samples.len() {
            return Err(ContractError::length_mismatch(
                stream,
                format!(
                    "{} timestamps for {} samples",
                    timestamps.len(),
                    samples.len()
                ),
            ));
        }
        Ok(Self {
            timestamps,
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Physiological recording with named channels (timing + signal)
pub trait SensorRecording: Send + Sync {
    /// Names of all channels in the recording
    fn channel_names(&self) -> Vec<String>;

    /// Look up a channel by name
    fn channel(&self, name: &str) -> Result<ChannelData, ContractError>;
}

/// Audio recording whose samples carry their own timestamps
pub trait AudioRecording: Send + Sync {
    /// Names of all channels in the recording
    fn channel_names(&self) -> Vec<String>;

    /// Look up a channel by name together with its timestamps
    fn channel_stream(&self, name: &str) -> Result<DenseStream, ContractError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dense_stream_length_check() {
        let ok = DenseStream::new(StreamKind::Audio, vec![0.0, 1.0], vec![0.5, -0.5]);
        assert!(ok.is_ok());

        let err = DenseStream::new(StreamKind::Audio, vec![0.0], vec![0.5, -0.5]).unwrap_err();
        assert!(matches!(err, ContractError::StreamLengthMismatch { .. }));
        assert!(err.to_string().contains("audio"));
    }

    #[test]
    fn test_stream_kind_serde() {
        let json = serde_json::to_string(&StreamKind::SecondaryVideo).unwrap();
        assert_eq!(json, "\"secondary_video\"");
    }
}
