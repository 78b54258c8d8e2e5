//! Alignment engine: run-global precomputation and per-anchor planning.

use std::ops::Range;

use contracts::{
    AudioRecording, ChannelsConfig, ContractError, FrameStore, RunBlueprint, ScalingConfig,
    SensorRecording, StreamKind, TimingConfig, WindowSettings,
};
use tracing::{info, instrument};

use crate::correspondence::{Correspondence, FrameCorrespondence};
use crate::scale::AmplitudeScale;
use crate::timestamp_index::TimestampIndex;
use crate::timing::{ResolvedTiming, TimingChannelResolver};
use crate::window::{sizing_from_config, AlignmentWindow, WindowPlanner};

/// Borrowed view of the four input streams
#[derive(Clone, Copy)]
pub struct EngineInputs<'a> {
    pub primary: &'a dyn FrameStore,
    pub secondary: &'a dyn FrameStore,
    pub sensor: &'a dyn SensorRecording,
    pub audio: &'a dyn AudioRecording,
}

/// Configuration subset the engine needs
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub channels: ChannelsConfig,
    pub timing: TimingConfig,
    pub window: WindowSettings,
    pub scaling: ScalingConfig,
}

impl EngineSettings {
    pub fn from_blueprint(blueprint: &RunBlueprint) -> Self {
        Self {
            channels: blueprint.channels.clone(),
            timing: blueprint.timing.clone(),
            window: blueprint.window.clone(),
            scaling: blueprint.scaling,
        }
    }
}

/// Dense stream with its timestamp index and amplitude scale
#[derive(Debug, Clone)]
pub struct SampleTrack {
    index: TimestampIndex,
    samples: Vec<f64>,
    scale: AmplitudeScale,
}

impl SampleTrack {
    pub fn new(
        index: TimestampIndex,
        samples: Vec<f64>,
        scale: AmplitudeScale,
    ) -> Result<Self, ContractError> {
        if index.len() != samples.len() {
            return Err(ContractError::length_mismatch(
                index.stream(),
                format!(
                    "{} timestamps for {} samples",
                    index.len(),
                    samples.len()
                ),
            ));
        }
        Ok(Self {
            index,
            samples,
            scale,
        })
    }

    pub fn stream(&self) -> StreamKind {
        self.index.stream()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn scale(&self) -> AmplitudeScale {
        self.scale
    }

    pub fn index(&self) -> &TimestampIndex {
        &self.index
    }

    /// Raw `(timestamp, sample)` pairs inside the window
    pub fn select(&self, window: &AlignmentWindow) -> Vec<(f64, f64)> {
        let ts = self.index.timestamps();
        self.index
            .range_indices(window.lo(), window.hi())
            .into_iter()
            .map(|i| (ts[i], self.samples[i]))
            .collect()
    }
}

/// Everything needed to compose one anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorPlan {
    pub anchor_index: usize,
    pub anchor_timestamp: f64,
    pub window: AlignmentWindow,
    pub correspondence: Correspondence,
    /// Timestamps of the primary triple (upper tick marks)
    pub primary_marks: [f64; 3],
    /// Timestamps of the secondary triple (lower tick marks)
    pub secondary_marks: [f64; 3],
}

/// Run-global values, for summaries and `--dry-run`
#[derive(Debug, Clone)]
pub struct EngineSummary {
    pub primary_frames: usize,
    pub secondary_frames: usize,
    pub sensor_samples: usize,
    pub audio_samples: usize,
    pub window_sizing: &'static str,
    pub half_width_s: f64,
    pub sensor_scale: f64,
    pub audio_scale: f64,
    pub timing_anchors: usize,
    pub timing_rate_hz: f64,
    pub timing_max_residual_s: f64,
    pub anchor_range: Range<usize>,
}

/// Immutable alignment state shared by all anchor workers
///
/// Construction performs every fatal precondition check; afterwards only
/// recoverable per-anchor errors can occur.
#[derive(Debug)]
pub struct AlignmentEngine {
    correspondence: FrameCorrespondence,
    planner: WindowPlanner,
    sensor: SampleTrack,
    audio: SampleTrack,
    timing: ResolvedTiming,
    window_sizing: &'static str,
    width_frames: f64,
}

impl AlignmentEngine {
    #[instrument(name = "alignment_engine_new", skip_all)]
    pub fn new(inputs: EngineInputs<'_>, settings: &EngineSettings) -> Result<Self, ContractError> {
        let primary = TimestampIndex::new(
            StreamKind::PrimaryVideo,
            inputs.primary.timestamps().to_vec(),
        )?;
        let secondary = TimestampIndex::new(
            StreamKind::SecondaryVideo,
            inputs.secondary.timestamps().to_vec(),
        )?;
        let correspondence = FrameCorrespondence::new(primary, secondary)?;

        let (sensor, timing) = Self::sensor_track(inputs.sensor, settings)?;
        let audio = Self::audio_track(inputs.audio, settings)?;

        let sizing = sizing_from_config(&settings.window);
        let planner = WindowPlanner::new(sizing.as_ref(), correspondence.primary())?;

        let engine = Self {
            correspondence,
            planner,
            sensor,
            audio,
            timing,
            window_sizing: sizing.name(),
            width_frames: settings.window.width_frames,
        };

        let summary = engine.summary();
        info!(
            half_width_s = summary.half_width_s,
            sizing = summary.window_sizing,
            sensor_scale = summary.sensor_scale,
            audio_scale = summary.audio_scale,
            anchors = summary.anchor_range.len(),
            "alignment engine ready"
        );

        Ok(engine)
    }

    fn sensor_track(
        recording: &dyn SensorRecording,
        settings: &EngineSettings,
    ) -> Result<(SampleTrack, ResolvedTiming), ContractError> {
        let timing_channel = recording.channel(&settings.channels.timing)?;
        let signal = recording.channel(&settings.channels.signal)?;
        if signal.samples.is_empty() {
            return Err(ContractError::EmptyStream {
                stream: StreamKind::Sensor,
            });
        }
        if timing_channel.samples.len() != signal.samples.len() {
            return Err(ContractError::length_mismatch(
                StreamKind::Sensor,
                format!(
                    "timing channel has {} samples, signal channel {}",
                    timing_channel.samples.len(),
                    signal.samples.len()
                ),
            ));
        }

        let resolver = TimingChannelResolver::from_config(&settings.timing);
        let timing = resolver.resolve(
            &timing_channel.name,
            &timing_channel.samples,
            timing_channel.sampling_rate,
        )?;

        let scale = AmplitudeScale::from_percentile(
            StreamKind::Sensor,
            &signal.samples,
            settings.scaling.signal_percentile,
            settings.scaling.margin,
        );
        let index = TimestampIndex::new(StreamKind::Sensor, timing.timestamps.clone())?;
        Ok((SampleTrack::new(index, signal.samples, scale)?, timing))
    }

    fn audio_track(
        recording: &dyn AudioRecording,
        settings: &EngineSettings,
    ) -> Result<SampleTrack, ContractError> {
        let stream = recording.channel_stream(&settings.channels.audio)?;
        let scale = AmplitudeScale::from_percentile(
            StreamKind::Audio,
            &stream.samples,
            settings.scaling.audio_percentile,
            settings.scaling.margin,
        );
        let index = TimestampIndex::new(StreamKind::Audio, stream.timestamps)?;
        SampleTrack::new(index, stream.samples, scale)
    }

    /// Valid anchors `[1 + W, N - 2 - W]`, `W = ceil(width_frames)`
    ///
    /// Empty when the primary stream is too short.
    pub fn anchor_range(&self) -> Range<usize> {
        let w = self.width_frames.ceil().max(0.0) as usize;
        let n = self.correspondence.primary().len();
        let start = 1 + w;
        let end = n.saturating_sub(1 + w);
        start..end.max(start)
    }

    /// Plan one anchor
    pub fn plan(&self, anchor: usize) -> Result<AnchorPlan, ContractError> {
        let correspondence = self.correspondence.for_anchor(anchor)?;
        let primary = self.correspondence.primary().timestamps();
        let secondary = self.correspondence.secondary().timestamps();

        let anchor_timestamp = primary[anchor];
        let primary_marks = correspondence.primary.map(|i| primary[i]);
        let secondary_marks = correspondence.secondary.map(|i| secondary[i]);

        metrics::histogram!("syncview_secondary_offset_seconds")
            .record((secondary_marks[1] - anchor_timestamp).abs());

        Ok(AnchorPlan {
            anchor_index: anchor,
            anchor_timestamp,
            window: self.planner.window_for(anchor_timestamp),
            correspondence,
            primary_marks,
            secondary_marks,
        })
    }

    #[inline]
    pub fn half_width(&self) -> f64 {
        self.planner.half_width()
    }

    #[inline]
    pub fn sensor(&self) -> &SampleTrack {
        &self.sensor
    }

    #[inline]
    pub fn audio(&self) -> &SampleTrack {
        &self.audio
    }

    pub fn summary(&self) -> EngineSummary {
        EngineSummary {
            primary_frames: self.correspondence.primary().len(),
            secondary_frames: self.correspondence.secondary().len(),
            sensor_samples: self.sensor.len(),
            audio_samples: self.audio.len(),
            window_sizing: self.window_sizing,
            half_width_s: self.half_width(),
            sensor_scale: self.sensor.scale().value(),
            audio_scale: self.audio.scale().value(),
            timing_anchors: self.timing.anchors,
            timing_rate_hz: self.timing.effective_rate(),
            timing_max_residual_s: self.timing.max_residual,
            anchor_range: self.anchor_range(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{TimingDecoderConfig, WindowSizingConfig};
    use ingestion::{MockDataset, MockDatasetConfig};

    fn settings(config: &MockDatasetConfig) -> EngineSettings {
        EngineSettings {
            channels: ChannelsConfig {
                timing: config.timing_channel.clone(),
                signal: config.signal_channel.clone(),
                audio: config.audio_channel.clone(),
            },
            timing: TimingConfig {
                decoder: config.timing_decoder(),
                ..TimingConfig::default()
            },
            window: WindowSettings::default(),
            scaling: ScalingConfig::default(),
        }
    }

    fn engine(config: &MockDatasetConfig) -> Result<AlignmentEngine, ContractError> {
        let data = MockDataset::generate(config)?;
        AlignmentEngine::new(
            EngineInputs {
                primary: &data.primary,
                secondary: &data.secondary,
                sensor: &data.sensor,
                audio: &data.audio,
            },
            &settings(config),
        )
    }

    #[test]
    fn test_reference_scenario() {
        let config = MockDatasetConfig::uniform(10, 1.0);
        let engine = engine(&config).unwrap();

        assert!((engine.half_width() - 3.1).abs() < 1e-9);

        let plan = engine.plan(5).unwrap();
        assert_eq!(plan.anchor_timestamp, 5.0);
        assert!((plan.window.lo() - 1.9).abs() < 1e-9);
        assert!((plan.window.hi() - 8.1).abs() < 1e-9);
        assert_eq!(plan.correspondence.primary, [4, 5, 6]);
        assert_eq!(plan.correspondence.secondary, [4, 5, 6]);
        assert!((plan.secondary_marks[0] - 4.2).abs() < 1e-9);
        assert_eq!(plan.primary_marks, [4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_anchor_range() {
        let engine = engine(&MockDatasetConfig::uniform(10, 1.0)).unwrap();
        // W = 3: anchors 4..=5
        assert_eq!(engine.anchor_range(), 4..6);
        for i in engine.anchor_range() {
            let plan = engine.plan(i).unwrap();
            assert!(plan.correspondence.primary.iter().all(|&p| p < 10));
        }
    }

    #[test]
    fn test_anchor_range_empty_for_short_stream() {
        let engine = engine(&MockDatasetConfig::uniform(6, 1.0)).unwrap();
        assert!(engine.anchor_range().is_empty());
    }

    #[test]
    fn test_short_secondary_is_fatal() {
        let mut config = MockDatasetConfig::uniform(10, 1.0);
        config.secondary_timestamps = vec![0.2, 1.2];
        let err = engine(&config).unwrap_err();
        assert!(matches!(
            err,
            ContractError::InsufficientNeighbors {
                stream: StreamKind::SecondaryVideo,
                available: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_primary_is_fatal() {
        let mut config = MockDatasetConfig::uniform(10, 1.0);
        config.primary_timestamps.clear();
        let err = engine(&config).unwrap_err();
        assert!(err.to_string().contains("primary video"), "got: {err}");
    }

    #[test]
    fn test_missing_channel_is_fatal() {
        let config = MockDatasetConfig::uniform(10, 1.0);
        let data = MockDataset::generate(&config).unwrap();
        let mut s = settings(&config);
        s.channels.signal = "MEG 9999".into();
        let err = AlignmentEngine::new(
            EngineInputs {
                primary: &data.primary,
                secondary: &data.secondary,
                sensor: &data.sensor,
                audio: &data.audio,
            },
            &s,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::ChannelNotFound { .. }));
    }

    #[test]
    fn test_wrong_timing_period_is_malformed() {
        let config = MockDatasetConfig::uniform(10, 1.0);
        let data = MockDataset::generate(&config).unwrap();
        let mut s = settings(&config);
        s.timing.decoder = TimingDecoderConfig::RisingEdge {
            period_s: -1.0,
            origin_s: 0.0,
            threshold: None,
        };
        let err = AlignmentEngine::new(
            EngineInputs {
                primary: &data.primary,
                secondary: &data.secondary,
                sensor: &data.sensor,
                audio: &data.audio,
            },
            &s,
        )
        .unwrap_err();
        assert!(matches!(err, ContractError::MalformedTimingChannel { .. }));
    }

    #[test]
    fn test_sensor_timestamps_follow_pulse_clock() {
        let engine = engine(&MockDatasetConfig::uniform(10, 1.0)).unwrap();
        let summary = engine.summary();
        assert!((summary.timing_rate_hz - 100.0).abs() < 1e-6);

        let plan = engine.plan(5).unwrap();
        let sensor = engine.sensor().select(&plan.window);
        let audio = engine.audio().select(&plan.window);
        // 6.2 s of window at 100 Hz and 1 kHz
        assert!((sensor.len() as i64 - 620).abs() <= 1);
        assert!((audio.len() as i64 - 6200).abs() <= 1);
        assert!(sensor.iter().all(|&(t, _)| plan.window.contains(t)));
    }

    #[test]
    fn test_fixed_sizing() {
        let config = MockDatasetConfig::uniform(10, 1.0);
        let data = MockDataset::generate(&config).unwrap();
        let mut s = settings(&config);
        s.window.sizing = WindowSizingConfig::Fixed { half_width_s: 0.5 };
        let engine = AlignmentEngine::new(
            EngineInputs {
                primary: &data.primary,
                secondary: &data.secondary,
                sensor: &data.sensor,
                audio: &data.audio,
            },
            &s,
        )
        .unwrap();
        assert_eq!(engine.half_width(), 0.5);
        assert_eq!(engine.summary().window_sizing, "fixed");
    }
}
