//! # Compositor
//!
//! Turns one anchor plan into a finished composite image.
//!
//! Responsibilities:
//! - Draw the sensor and audio traces of the anchor window with tick marks
//! - Decode the six frames of the correspondence
//! - Lay out tiles and trace panel, encode the result as PNG

mod anchor;
mod frame;
mod trace;

// Re-exports
pub use anchor::{encode_png, AnchorComposer};
pub use frame::{decode_tile, FrameCompositor, TileSize};
pub use trace::{
    SkiaTraceRenderer, TraceCompositor, TracePlot, TraceRenderer, TraceStyle, FRAME_WIDTH_PT,
    TRACE_WIDTH_PT,
};
