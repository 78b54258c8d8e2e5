//! # Dispatcher
//!
//! Delivers rendered composites to output sinks.
//!
//! Each sink runs in its own worker task behind a bounded queue. Sends
//! wait for queue space, so a slow disk slows rendering down instead of
//! losing images; a failing write is counted and logged without stopping
//! the other sinks.

pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod sinks;

pub use contracts::{DataSink, RenderedComposite};
pub use dispatcher::{
    create_dispatcher, DispatchReport, Dispatcher, DispatcherBuilder, LOG_SINK, PNG_SINK,
};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{LogSink, PngFileSink};
