//! # Ingestion
//!
//! Concrete stream collaborators.
//!
//! Responsibilities:
//! - Open frame directories (`frames.json` manifest + encoded images)
//! - Open raw sample recordings (JSON header + little-endian samples)
//! - Generate a deterministic synthetic data set for tests and `--mock`
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::SourceSet;
//!
//! let sources = SourceSet::open(&blueprint)?;
//! println!("{} primary frames", sources.primary.len());
//! ```
//!
//! ## Mock Data
//!
//! ```ignore
//! use ingestion::{MockDataset, MockDatasetConfig, SourceSet};
//!
//! let data = MockDataset::generate(&MockDatasetConfig::uniform(10, 1.0))?;
//! let sources = SourceSet::from(data);
//! ```

mod error;
mod frame_store;
mod mock;
mod recording;
mod sources;

// Re-exports
pub use error::{IngestionError, Result};
pub use frame_store::{DirectoryFrameStore, MemoryFrameStore, MANIFEST_FILE};
pub use mock::{MockDataset, MockDatasetConfig};
pub use recording::{RawRecording, SampleLayout};
pub use sources::SourceSet;
