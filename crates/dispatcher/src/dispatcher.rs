//! Dispatcher - fans rendered composites out to the sinks

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use contracts::{OutputConfig, RenderedComposite};

use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::{MetricsSnapshot, SinkMetrics};
use crate::sinks::{LogSink, PngFileSink};

/// Name of the PNG file sink in reports
pub const PNG_SINK: &str = "png";

/// Name of the optional log sink in reports
pub const LOG_SINK: &str = "log";

/// Final per-sink counters, in sink order
pub type DispatchReport = Vec<(String, MetricsSnapshot)>;

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    output: OutputConfig,
    input_rx: mpsc::Receiver<RenderedComposite>,
}

impl DispatcherBuilder {
    pub fn new(output: OutputConfig, input_rx: mpsc::Receiver<RenderedComposite>) -> Self {
        Self { output, input_rx }
    }

    /// Create the sinks and spawn their workers
    ///
    /// Must be called inside a tokio runtime.
    #[instrument(
        name = "dispatcher_builder_build",
        skip(self),
        fields(directory = %self.output.directory.display(), log_sink = self.output.log_sink)
    )]
    pub fn build(self) -> Result<Dispatcher, DispatcherError> {
        let capacity = self.output.queue_capacity;
        let png = PngFileSink::from_output(PNG_SINK, &self.output)
            .map_err(|e| DispatcherError::sink_creation(PNG_SINK, e.to_string()))?;

        let mut handles = vec![SinkHandle::spawn(png, capacity)];
        if self.output.log_sink {
            handles.push(SinkHandle::spawn(LogSink::new(LOG_SINK), capacity));
        }

        Ok(Dispatcher {
            handles,
            input_rx: self.input_rx,
        })
    }
}

/// Consumes composites and forwards every one to each sink
pub struct Dispatcher {
    handles: Vec<SinkHandle>,
    input_rx: mpsc::Receiver<RenderedComposite>,
}

impl Dispatcher {
    /// Create a dispatcher with custom sink handles
    pub fn with_handles(
        handles: Vec<SinkHandle>,
        input_rx: mpsc::Receiver<RenderedComposite>,
    ) -> Self {
        Self { handles, input_rx }
    }

    /// Get metrics for all sinks
    pub fn metrics(&self) -> DispatchReport {
        self.handles
            .iter()
            .map(|h| (h.name().to_string(), h.metrics().snapshot()))
            .collect()
    }

    /// Run until the input channel closes and every sink has drained
    ///
    /// Returns the final per-sink counters.
    #[instrument(name = "dispatcher_run", skip(self))]
    pub async fn run(mut self) -> DispatchReport {
        info!(sinks = self.handles.len(), "Dispatcher started");

        let tracked: Vec<(String, Arc<SinkMetrics>)> = self
            .handles
            .iter()
            .map(|h| (h.name().to_string(), Arc::clone(h.metrics())))
            .collect();

        let mut count: u64 = 0;
        while let Some(composite) = self.input_rx.recv().await {
            count += 1;
            self.dispatch(composite).await;

            if count.is_multiple_of(100) {
                debug!(composites = count, "Dispatcher progress");
            }
        }

        info!(composites = count, "Dispatcher input closed, shutting down");

        for handle in self.handles {
            handle.shutdown().await;
        }

        info!("Dispatcher shutdown complete");

        tracked
            .into_iter()
            .map(|(name, metrics)| (name, metrics.snapshot()))
            .collect()
    }

    /// Spawn the dispatcher as a background task
    pub fn spawn(self) -> JoinHandle<DispatchReport> {
        tokio::spawn(self.run())
    }

    async fn dispatch(&self, composite: RenderedComposite) {
        for handle in &self.handles {
            if let Err(e) = handle.send(composite.clone()).await {
                error!(error = %e, "Composite not delivered");
            }
        }
    }
}

/// Create a dispatcher for the run's output section
pub fn create_dispatcher(
    output: &OutputConfig,
    input_rx: mpsc::Receiver<RenderedComposite>,
) -> Result<Dispatcher, DispatcherError> {
    DispatcherBuilder::new(output.clone(), input_rx).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use tempfile::tempdir;

    fn composite(anchor_index: usize) -> RenderedComposite {
        RenderedComposite {
            anchor_index,
            anchor_timestamp: anchor_index as f64,
            width: 1,
            height: 1,
            png: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn output(dir: &std::path::Path, log_sink: bool) -> OutputConfig {
        OutputConfig {
            directory: dir.to_path_buf(),
            file_prefix: "frame".to_string(),
            log_sink,
            queue_capacity: 2,
        }
    }

    #[tokio::test]
    async fn test_dispatcher_fanout() {
        let (input_tx, input_rx) = mpsc::channel(10);

        let handles = vec![
            SinkHandle::spawn(LogSink::new("sink1"), 10),
            SinkHandle::spawn(LogSink::new("sink2"), 10),
        ];
        let handle = Dispatcher::with_handles(handles, input_rx).spawn();

        for i in 0..5 {
            input_tx.send(composite(i)).await.unwrap();
        }
        drop(input_tx);

        let report = handle.await.unwrap();
        assert_eq!(report.len(), 2);
        assert!(report.iter().all(|(_, m)| m.write_count == 5));
    }

    #[tokio::test]
    async fn test_create_dispatcher_from_output() {
        let dir = tempdir().unwrap();
        let (input_tx, input_rx) = mpsc::channel(1);

        let dispatcher = create_dispatcher(&output(dir.path(), true), input_rx).unwrap();
        assert_eq!(dispatcher.metrics().len(), 2);
        let handle = dispatcher.spawn();

        for i in 0..20 {
            input_tx.send(composite(i)).await.unwrap();
        }
        drop(input_tx);

        let report = handle.await.unwrap();
        let (name, png) = &report[0];
        assert_eq!(name, PNG_SINK);
        assert_eq!(png.write_count, 20);
        assert_eq!(png.failure_count, 0);
        assert!(dir.path().join("frame-0000019.png").exists());
    }

    #[tokio::test]
    async fn test_log_sink_is_optional() {
        let dir = tempdir().unwrap();
        let (_tx, rx) = mpsc::channel(1);
        let dispatcher = create_dispatcher(&output(dir.path(), false), rx).unwrap();
        let names: Vec<String> = dispatcher.metrics().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec![PNG_SINK.to_string()]);
    }
}
