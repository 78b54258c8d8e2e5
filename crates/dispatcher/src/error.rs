//! Dispatcher error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A sink could not be set up (e.g. output directory not creatable)
    #[error("sink '{name}' could not be created: {message}")]
    SinkCreation { name: String, message: String },

    /// The sink worker stopped before accepting the composite
    #[error("sink '{sink_name}' is no longer running, anchor {anchor_index} dropped")]
    WorkerClosed {
        sink_name: String,
        anchor_index: usize,
    },
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, message: impl ToString) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.to_string(),
        }
    }
}
