//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Contract snapshot tests
//! - Mock e2e tests (generated data set, no recordings on disk)

#[cfg(test)]
mod contract_tests {
    use contracts::{ContractError, StreamKind};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
    }

    #[test]
    fn test_fatal_and_recoverable_partition() {
        let fatal = ContractError::InsufficientNeighbors {
            stream: StreamKind::SecondaryVideo,
            available: 2,
            required: 3,
        };
        let skip = ContractError::EmptyWindow { lo: 1.0, hi: 2.0 };
        assert!(!fatal.is_recoverable());
        assert!(skip.is_recoverable());
        assert_eq!(skip.skip_reason(), "empty_window");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use compositor::AnchorComposer;
    use contracts::{
        ChannelsConfig, ContractError, EncodedFrame, LayoutConfig, OutputConfig, ScalingConfig,
        StreamKind, TimingConfig, WindowSettings,
    };
    use ingestion::{MockDataset, MockDatasetConfig, SourceSet};
    use observability::RunMetricsAggregator;
    use sync_engine::{AlignmentEngine, EngineInputs, EngineSettings};
    use tokio::sync::mpsc;

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

    fn build(config: &MockDatasetConfig) -> Result<(SourceSet, AlignmentEngine), ContractError> {
        let sources = SourceSet::from(MockDataset::generate(config)?);
        let engine = AlignmentEngine::new(
            EngineInputs {
                primary: sources.primary.as_ref(),
                secondary: sources.secondary.as_ref(),
                sensor: sources.sensor.as_ref(),
                audio: sources.audio.as_ref(),
            },
            &settings(config),
        )?;
        Ok((sources, engine))
    }

    fn output(dir: &Path) -> OutputConfig {
        OutputConfig {
            directory: dir.to_path_buf(),
            file_prefix: "frame".to_string(),
            log_sink: true,
            queue_capacity: 2,
        }
    }

    /// Mock data set -> AlignmentEngine -> AnchorComposer -> Dispatcher
    ///
    /// Renders every anchor in range; recoverable errors are counted as
    /// skips, fatal errors abort the run.
    async fn run_pipeline(
        config: &MockDatasetConfig,
        out: &Path,
    ) -> Result<RunMetricsAggregator, ContractError> {
        let (sources, engine) = build(config)?;
        let anchors: Vec<usize> = engine.anchor_range().collect();

        let (tx, rx) = mpsc::channel(4);
        let dispatcher = dispatcher::create_dispatcher(&output(out), rx)
            .map_err(|e| ContractError::Other(e.to_string()))?
            .spawn();

        let composer = AnchorComposer::new(
            Arc::new(engine),
            Arc::clone(&sources.primary),
            Arc::clone(&sources.secondary),
            &LayoutConfig {
                tile_width: config.tile_width,
                tile_height: config.tile_height,
                dpi: 80.0,
            },
        );

        let mut run = RunMetricsAggregator::new(anchors.len());
        for anchor in anchors {
            match composer.compose(anchor) {
                Ok(composite) => {
                    run.record_rendered(Duration::from_millis(1), composite.png.len());
                    tx.send(composite)
                        .await
                        .map_err(|e| ContractError::Other(e.to_string()))?;
                }
                Err(e) if e.is_recoverable() => run.record_skipped(&e),
                Err(e) => return Err(e),
            }
        }
        drop(tx);

        let report = dispatcher
            .await
            .map_err(|e| ContractError::Other(e.to_string()))?;
        for (name, snapshot) in &report {
            run.record_sink(name, snapshot.write_count, snapshot.failure_count);
        }
        Ok(run)
    }

    fn png_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|n| n.ends_with(".png"))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// 10 primary frames at 1 fps, secondary offset by 0.2 s
    #[test]
    fn test_reference_scenario() {
        let (_sources, engine) = build(&MockDatasetConfig::uniform(10, 1.0)).unwrap();

        assert!((engine.half_width() - 3.1).abs() < 1e-9);
        let plan = engine.plan(5).unwrap();
        assert!((plan.window.lo() - 1.9).abs() < 1e-9);
        assert!((plan.window.hi() - 8.1).abs() < 1e-9);
        assert_eq!(plan.correspondence.primary, [4, 5, 6]);
        assert_eq!(plan.correspondence.secondary, [4, 5, 6]);
        let expected = [4.2, 5.2, 6.2];
        for (mark, want) in plan.secondary_marks.iter().zip(expected) {
            assert!((mark - want).abs() < 1e-9);
        }
    }

    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("composites");
        let config = MockDatasetConfig::uniform(12, 1.0);

        let summary = run_pipeline(&config, &out)
            .await
            .unwrap()
            .summary(Duration::from_secs(1), false);

        // W = 3: anchors 4..=7
        assert_eq!(summary.anchors_planned, 4);
        assert_eq!(summary.rendered, 4);
        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.sink_writes(dispatcher::PNG_SINK), 4);
        assert_eq!(summary.sink_writes(dispatcher::LOG_SINK), 4);
        assert_eq!(summary.sink_failures(), 0);
        assert_eq!(
            png_files(&out),
            vec![
                "frame-0000004.png",
                "frame-0000005.png",
                "frame-0000006.png",
                "frame-0000007.png",
            ]
        );

        // 64x48 tiles: 3 wide, two rows plus a 32 px trace panel
        let composite = load_composite(&out.join("frame-0000005.png"));
        assert_eq!(composite.dimensions(), (192, 128));

        // Primary row on top, trace panel below it, secondary row last.
        let primary = [160, 90, 40];
        let secondary = [40, 90, 160];
        assert_eq!(composite.get_pixel(10, 10).0, primary);
        assert_eq!(composite.get_pixel(10, 47).0, primary);
        for y in 48..80 {
            let px = composite.get_pixel(10, y).0;
            assert_ne!(px, primary, "row {y}");
            assert_ne!(px, secondary, "row {y}");
        }
        assert_eq!(composite.get_pixel(10, 80).0, secondary);
        assert_eq!(composite.get_pixel(10, 127).0, secondary);
    }

    fn load_composite(path: &Path) -> image::RgbImage {
        let frame = EncodedFrame {
            index: 0,
            timestamp: 0.0,
            data: std::fs::read(path).unwrap().into(),
        };
        compositor::decode_tile(StreamKind::PrimaryVideo, &frame).unwrap()
    }

    #[tokio::test]
    async fn test_empty_window_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MockDatasetConfig::uniform(20, 1.0);
        // Sensor and audio end at 8 s, so late anchors see no samples.
        config.signal_span = Some((0.0, 8.0));

        let summary = run_pipeline(&config, dir.path())
            .await
            .unwrap()
            .summary(Duration::from_secs(1), false);

        assert_eq!(summary.anchors_planned, 12);
        assert!(summary.rendered > 0);
        assert!(summary.skipped > 0);
        // Anchors 12..=15 start after the last sample.
        assert_eq!(summary.rendered, 8);
        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.skip_counts.get("empty_window"), Some(&summary.skipped));
        assert_eq!(png_files(dir.path()).len() as u64, summary.rendered);
        // Window of anchor 15 is [11.9, 18.1]
        assert!(!dir.path().join("frame-0000015.png").exists());
        assert!(dir.path().join("frame-0000004.png").exists());
    }

    #[tokio::test]
    async fn test_short_secondary_aborts_before_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("never");
        let mut config = MockDatasetConfig::uniform(10, 1.0);
        config.secondary_timestamps = vec![0.2, 1.2];

        let err = run_pipeline(&config, &out).await.unwrap_err();
        assert!(matches!(err, ContractError::InsufficientNeighbors { .. }));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_corrupt_frame_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = MockDatasetConfig::uniform(12, 1.0);
        // Frame 5 is a neighbour of anchors 4, 5 and 6.
        config.corrupt_primary_frames = vec![5];

        let summary = run_pipeline(&config, dir.path())
            .await
            .unwrap()
            .summary(Duration::from_secs(1), false);

        assert_eq!(summary.rendered, 1);
        assert_eq!(summary.skipped, 3);
        assert_eq!(summary.skip_counts.get("frame_decode"), Some(&3));
        assert_eq!(png_files(dir.path()), vec!["frame-0000007.png"]);
    }
}
