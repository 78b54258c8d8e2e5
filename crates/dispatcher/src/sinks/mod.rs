//! Sink implementations
//!
//! Contains PngFileSink and LogSink.

mod log;
mod png;

pub use self::log::LogSink;
pub use self::png::PngFileSink;
