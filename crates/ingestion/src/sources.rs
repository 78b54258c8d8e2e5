//! Opened input streams for one run

use std::sync::Arc;

use contracts::{AudioRecording, FrameStore, RunBlueprint, SensorRecording, StreamKind};
use tracing::info;

use crate::error::Result;
use crate::frame_store::DirectoryFrameStore;
use crate::mock::MockDataset;
use crate::recording::RawRecording;

/// The four streams of a run, shareable across worker threads
#[derive(Clone)]
pub struct SourceSet {
    pub primary: Arc<dyn FrameStore>,
    pub secondary: Arc<dyn FrameStore>,
    pub audio: Arc<dyn AudioRecording>,
    pub sensor: Arc<dyn SensorRecording>,
}

impl SourceSet {
    /// Open every source named in `[sources]`
    pub fn open(blueprint: &RunBlueprint) -> Result<Self> {
        let sources = &blueprint.sources;
        let primary = DirectoryFrameStore::open(&sources.primary_video, StreamKind::PrimaryVideo)?;
        let secondary =
            DirectoryFrameStore::open(&sources.secondary_video, StreamKind::SecondaryVideo)?;
        let audio = RawRecording::open(&sources.audio, StreamKind::Audio)?;
        let sensor = RawRecording::open(&sources.sensor, StreamKind::Sensor)?;

        info!(
            primary_frames = primary.len(),
            secondary_frames = secondary.len(),
            "sources opened"
        );

        Ok(Self {
            primary: Arc::new(primary),
            secondary: Arc::new(secondary),
            audio: Arc::new(audio),
            sensor: Arc::new(sensor),
        })
    }
}

impl From<MockDataset> for SourceSet {
    fn from(data: MockDataset) -> Self {
        Self {
            primary: Arc::new(data.primary),
            secondary: Arc::new(data.secondary),
            audio: Arc::new(data.audio),
            sensor: Arc::new(data.sensor),
        }
    }
}
