//! Frame stores
//!
//! Two [`FrameStore`] implementations:
//! - [`DirectoryFrameStore`]: a directory with a `frames.json` manifest and
//!   one encoded image file per frame, read lazily
//! - [`MemoryFrameStore`]: encoded frames held in memory

use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{ContractError, EncodedFrame, FrameStore, StreamKind};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};

/// Manifest file name inside a frame directory
pub const MANIFEST_FILE: &str = "frames.json";

#[derive(Debug, Deserialize)]
struct Manifest {
    frames: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    file: PathBuf,
    timestamp: f64,
}

/// Frames stored as individual files next to a manifest
///
/// Opening reads only the manifest; every [`FrameStore::frame`] call reads
/// one file. Safe to share between threads.
#[derive(Debug)]
pub struct DirectoryFrameStore {
    stream: StreamKind,
    root: PathBuf,
    files: Vec<PathBuf>,
    timestamps: Vec<f64>,
}

impl DirectoryFrameStore {
    /// Open the frame directory at `dir`
    pub fn open(dir: impl AsRef<Path>, stream: StreamKind) -> Result<Self> {
        let root = dir.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&manifest_path)
            .map_err(|e| IngestionError::read(&manifest_path, e))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|e| IngestionError::manifest(&manifest_path, e.to_string()))?;

        let mut files = Vec::with_capacity(manifest.frames.len());
        let mut timestamps = Vec::with_capacity(manifest.frames.len());
        for (i, entry) in manifest.frames.into_iter().enumerate() {
            if !entry.timestamp.is_finite() {
                return Err(IngestionError::manifest(
                    &manifest_path,
                    format!("frame {i} has a non-finite timestamp"),
                ));
            }
            files.push(entry.file);
            timestamps.push(entry.timestamp);
        }

        debug!(
            stream = %stream,
            path = %root.display(),
            frames = files.len(),
            "frame store opened"
        );

        Ok(Self {
            stream,
            root,
            files,
            timestamps,
        })
    }

    /// Directory the store was opened from
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FrameStore for DirectoryFrameStore {
    fn len(&self) -> usize {
        self.files.len()
    }

    fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    fn frame(&self, index: usize) -> std::result::Result<EncodedFrame, ContractError> {
        let file = self.files.get(index).ok_or(ContractError::FrameNotFound {
            stream: self.stream,
            index,
            len: self.files.len(),
        })?;
        let path = self.root.join(file);
        let data = std::fs::read(&path).map_err(|e| {
            ContractError::frame_decode(self.stream, index, format!("{}: {e}", path.display()))
        })?;

        trace!(stream = %self.stream, index, bytes = data.len(), "frame read");

        Ok(EncodedFrame {
            index,
            timestamp: self.timestamps[index],
            data: Bytes::from(data),
        })
    }
}

/// Encoded frames held in memory
#[derive(Debug, Clone)]
pub struct MemoryFrameStore {
    stream: StreamKind,
    frames: Vec<Bytes>,
    timestamps: Vec<f64>,
}

impl MemoryFrameStore {
    /// Create a store from parallel timestamp and frame arrays
    pub fn new(
        stream: StreamKind,
        timestamps: Vec<f64>,
        frames: Vec<Bytes>,
    ) -> std::result::Result<Self, ContractError> {
        if timestamps.len() != frames.len() {
            return Err(ContractError::length_mismatch(
                stream,
                format!("{} timestamps for {} frames", timestamps.len(), frames.len()),
            ));
        }
        Ok(Self {
            stream,
            frames,
            timestamps,
        })
    }

    /// Empty store
    pub fn empty(stream: StreamKind) -> Self {
        Self {
            stream,
            frames: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    /// Append one frame
    pub fn push(&mut self, timestamp: f64, data: Bytes) {
        self.timestamps.push(timestamp);
        self.frames.push(data);
    }
}

impl FrameStore for MemoryFrameStore {
    fn len(&self) -> usize {
        self.frames.len()
    }

    fn timestamps(&self) -> &[f64] {
        &self.timestamps
    }

    fn frame(&self, index: usize) -> std::result::Result<EncodedFrame, ContractError> {
        let data = self.frames.get(index).ok_or(ContractError::FrameNotFound {
            stream: self.stream,
            index,
            len: self.frames.len(),
        })?;
        Ok(EncodedFrame {
            index,
            timestamp: self.timestamps[index],
            data: data.clone(),
        })
    }
}
