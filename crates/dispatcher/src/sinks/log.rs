//! LogSink - logs a composite summary via tracing

use contracts::{ContractError, DataSink, RenderedComposite};
use tracing::{debug, info, instrument};

/// Sink that only reports composites, for debugging
pub struct LogSink {
    name: String,
    count: u64,
}

impl LogSink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            count: 0,
        }
    }
}

impl DataSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, composite),
        fields(sink = %self.name, anchor = composite.anchor_index)
    )]
    async fn write(&mut self, composite: &RenderedComposite) -> Result<(), ContractError> {
        self.count += 1;
        debug!(
            sink = %self.name,
            anchor = composite.anchor_index,
            t = composite.anchor_timestamp,
            width = composite.width,
            height = composite.height,
            bytes = composite.png.len(),
            "Composite received"
        );
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, composites = self.count, "LogSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_log_sink_write() {
        let mut sink = LogSink::new("test_log");
        let composite = RenderedComposite {
            anchor_index: 1,
            anchor_timestamp: 1.0,
            width: 3,
            height: 3,
            png: Bytes::new(),
        };

        assert!(sink.write(&composite).await.is_ok());
        assert_eq!(sink.count, 1);
        assert!(sink.close().await.is_ok());
    }

    #[tokio::test]
    async fn test_log_sink_name() {
        let sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
    }
}
