//! Output side of the pipeline: where finished composites go.

use crate::{ContractError, RenderedComposite};

/// Destination for rendered composites
///
/// Each sink runs on its own worker task, so implementations may block on
/// I/O without stalling the anchor workers.
#[trait_variant::make(DataSink: Send)]
pub trait LocalDataSink {
    /// Label used in logs and metrics
    fn name(&self) -> &str;

    /// Store one composite; errors carry the target (e.g. file path)
    async fn write(&mut self, composite: &RenderedComposite) -> Result<(), ContractError>;

    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Called once after the last write
    async fn close(&mut self) -> Result<(), ContractError>;
}
