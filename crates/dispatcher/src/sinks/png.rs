//! PngFileSink - one PNG file per anchor, written atomically

use contracts::{ContractError, DataSink, OutputConfig, RenderedComposite};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::Builder;
use tracing::{debug, instrument};

/// Sink that stores composites as `<directory>/<prefix>-<anchor:07>.png`
///
/// Bytes go to a hidden temporary file in the target directory which is
/// then renamed over the final name. A reader never sees a partial image,
/// and an existing file for the same anchor is replaced whole.
pub struct PngFileSink {
    name: String,
    directory: PathBuf,
    prefix: String,
}

impl PngFileSink {
    /// Create the sink, creating `directory` if needed
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<PathBuf>,
        prefix: impl Into<String>,
    ) -> std::io::Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)?;
        Ok(Self {
            name: name.into(),
            directory,
            prefix: prefix.into(),
        })
    }

    /// Sink for the run's output section
    pub fn from_output(name: impl Into<String>, output: &OutputConfig) -> std::io::Result<Self> {
        Self::new(name, &output.directory, &output.file_prefix)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Final path of a composite
    pub fn path_for(&self, composite: &RenderedComposite) -> PathBuf {
        self.directory.join(composite.file_name(&self.prefix))
    }

    fn persist(&self, composite: &RenderedComposite) -> std::io::Result<PathBuf> {
        let path = self.path_for(composite);
        let mut tmp = Builder::new()
            .prefix(".syncview-")
            .suffix(".tmp")
            .tempfile_in(&self.directory)?;
        tmp.write_all(&composite.png)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }
}

impl DataSink for PngFileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "png_sink_write",
        skip(self, composite),
        fields(sink = %self.name, anchor = composite.anchor_index)
    )]
    async fn write(&mut self, composite: &RenderedComposite) -> Result<(), ContractError> {
        let path = self
            .persist(composite)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(path = %path.display(), bytes = composite.png.len(), "Composite written");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "png_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "PngFileSink closed");
        Ok(())
    }
}
