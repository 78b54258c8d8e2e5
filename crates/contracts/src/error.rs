//! Layered error definitions
//!
//! Categorized by source: config / stream preconditions / anchor / render / sink

use thiserror::Error;

use crate::StreamKind;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Run Preconditions (fatal) =====
    /// A stream has no elements at all
    #[error("{stream} stream is empty")]
    EmptyStream { stream: StreamKind },

    /// Primary stream too short to define a frame gap
    #[error("{stream} stream has insufficient data: {message}")]
    InsufficientData { stream: StreamKind, message: String },

    /// Timing channel could not be turned into monotonic timestamps
    #[error("malformed timing channel '{channel}': {message}")]
    MalformedTimingChannel { channel: String, message: String },

    /// Fewer elements than neighbours requested
    #[error("{stream} stream has {available} elements, at least {required} required")]
    InsufficientNeighbors {
        stream: StreamKind,
        available: usize,
        required: usize,
    },

    /// Named channel missing from a recording
    #[error("channel '{channel}' not found in {stream} recording (available: {available:?})")]
    ChannelNotFound {
        stream: StreamKind,
        channel: String,
        available: Vec<String>,
    },

    /// Parallel arrays of a stream disagree in length
    #[error("{stream} stream length mismatch: {message}")]
    StreamLengthMismatch { stream: StreamKind, message: String },

    // ===== Per-anchor Errors (recoverable) =====
    /// No signal samples inside the trace window
    #[error("no sensor or audio samples in window [{lo:.6}, {hi:.6})")]
    EmptyWindow { lo: f64, hi: f64 },

    /// A tile does not have the declared geometry
    #[error("{tile} is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    TileSizeMismatch {
        tile: String,
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    /// Frame index outside the store
    #[error("{stream} frame {index} not found (store has {len} frames)")]
    FrameNotFound {
        stream: StreamKind,
        index: usize,
        len: usize,
    },

    /// Encoded frame could not be decoded
    #[error("failed to decode {stream} frame {index}: {message}")]
    FrameDecode {
        stream: StreamKind,
        index: usize,
        message: String,
    },

    /// Anchor outside the range the correspondence can serve
    #[error("anchor {index} out of range for {stream} stream of length {len}")]
    AnchorOutOfRange {
        stream: StreamKind,
        index: usize,
        len: usize,
    },

    /// Rasterization failure
    #[error("render error: {message}")]
    Render { message: String },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create insufficient data error
    pub fn insufficient_data(stream: StreamKind, message: impl Into<String>) -> Self {
        Self::InsufficientData {
            stream,
            message: message.into(),
        }
    }

    /// Create malformed timing channel error
    pub fn malformed_timing(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedTimingChannel {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Create stream length mismatch error
    pub fn length_mismatch(stream: StreamKind, message: impl Into<String>) -> Self {
        Self::StreamLengthMismatch {
            stream,
            message: message.into(),
        }
    }

    /// Create frame decode error
    pub fn frame_decode(stream: StreamKind, index: usize, message: impl Into<String>) -> Self {
        Self::FrameDecode {
            stream,
            index,
            message: message.into(),
        }
    }

    /// Create render error
    pub fn render(message: impl Into<String>) -> Self {
        Self::Render {
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether the failure only affects a single anchor.
    ///
    /// Recoverable errors skip the anchor and the run continues; everything
    /// else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EmptyWindow { .. }
                | Self::TileSizeMismatch { .. }
                | Self::FrameNotFound { .. }
                | Self::FrameDecode { .. }
                | Self::Render { .. }
        )
    }

    /// Short stable label for logs and metrics
    pub fn skip_reason(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } => "config_parse",
            Self::ConfigValidation { .. } => "config_validation",
            Self::EmptyStream { .. } => "empty_stream",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::MalformedTimingChannel { .. } => "malformed_timing_channel",
            Self::InsufficientNeighbors { .. } => "insufficient_neighbors",
            Self::ChannelNotFound { .. } => "channel_not_found",
            Self::StreamLengthMismatch { .. } => "stream_length_mismatch",
            Self::EmptyWindow { .. } => "empty_window",
            Self::TileSizeMismatch { .. } => "tile_size_mismatch",
            Self::FrameNotFound { .. } => "frame_not_found",
            Self::FrameDecode { .. } => "frame_decode",
            Self::AnchorOutOfRange { .. } => "anchor_out_of_range",
            Self::Render { .. } => "render",
            Self::SinkWrite { .. } => "sink_write",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_errors_are_recoverable() {
        assert!(ContractError::EmptyWindow { lo: 0.0, hi: 1.0 }.is_recoverable());
        assert!(ContractError::TileSizeMismatch {
            tile: "primary frame 0".into(),
            expected_width: 4,
            expected_height: 3,
            actual_width: 5,
            actual_height: 3,
        }
        .is_recoverable());
        assert!(ContractError::frame_decode(StreamKind::SecondaryVideo, 3, "bad png").is_recoverable());
    }

    #[test]
    fn test_precondition_errors_are_fatal() {
        assert!(!ContractError::EmptyStream {
            stream: StreamKind::Audio
        }
        .is_recoverable());
        assert!(!ContractError::InsufficientNeighbors {
            stream: StreamKind::SecondaryVideo,
            available: 2,
            required: 3,
        }
        .is_recoverable());
        assert!(!ContractError::malformed_timing("STI 006", "slope <= 0").is_recoverable());
    }

    #[test]
    fn test_message_names_stream() {
        let err = ContractError::InsufficientNeighbors {
            stream: StreamKind::SecondaryVideo,
            available: 2,
            required: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("secondary video"), "got: {msg}");
        assert_eq!(err.skip_reason(), "insufficient_neighbors");
    }
}
