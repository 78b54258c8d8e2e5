//! # Sync Engine
//!
//! Cross-stream temporal alignment.
//!
//! Responsibilities:
//! - Nearest-neighbour and range queries over stream timelines
//! - Sensor sample timestamps from the digital timing channel
//! - Run-global window half-width and amplitude scales
//! - Per-anchor frame correspondence and trace window
//!
//! ## Usage Example
//!
//! ```ignore
//! use sync_engine::{AlignmentEngine, EngineInputs, EngineSettings};
//!
//! let engine = AlignmentEngine::new(
//!     EngineInputs {
//!         primary: sources.primary.as_ref(),
//!         secondary: sources.secondary.as_ref(),
//!         sensor: sources.sensor.as_ref(),
//!         audio: sources.audio.as_ref(),
//!     },
//!     &EngineSettings::from_blueprint(&blueprint),
//! )?;
//!
//! for anchor in engine.anchor_range() {
//!     let plan = engine.plan(anchor)?;
//!     // Compose the anchor
//! }
//! ```

mod correspondence;
mod engine;
mod scale;
mod timestamp_index;
mod timing;
mod window;

// Re-exports
pub use correspondence::{Correspondence, FrameCorrespondence, SECONDARY_NEIGHBORS};
pub use engine::{
    AlignmentEngine, AnchorPlan, EngineInputs, EngineSettings, EngineSummary, SampleTrack,
};
pub use scale::{percentile_of, AmplitudeScale};
pub use timestamp_index::TimestampIndex;
pub use timing::{
    decoder_from_config, PulseAnchor, ResolvedTiming, RisingEdgeDecoder, TimingChannelResolver,
    TimingDecoder,
};
pub use window::{
    compute_half_width, sizing_from_config, window_for, AlignmentWindow, FixedSizing,
    MaxGapSizing, WindowPlanner, WindowSizing, WINDOW_MARGIN_FRAMES,
};
