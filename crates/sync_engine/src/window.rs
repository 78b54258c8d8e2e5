//! Alignment window calculation.
//!
//! The half-width is a run-global value: it is derived once from the whole
//! primary timeline and every anchor window is the same interval recentred
//! on the anchor timestamp.

use contracts::{ContractError, StreamKind, WindowSettings, WindowSizingConfig};

use crate::timestamp_index::TimestampIndex;

/// Extra fraction of a frame gap added to the window width
pub const WINDOW_MARGIN_FRAMES: f64 = 0.1;

/// Symmetric window `[center - half_width, center + half_width)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentWindow {
    pub center: f64,
    pub half_width: f64,
}

impl AlignmentWindow {
    #[inline]
    pub fn lo(&self) -> f64 {
        self.center - self.half_width
    }

    #[inline]
    pub fn hi(&self) -> f64 {
        self.center + self.half_width
    }

    /// Half-open membership test
    #[inline]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.lo() && t < self.hi()
    }
}

/// Window for one anchor
#[inline]
pub fn window_for(anchor_timestamp: f64, half_width: f64) -> AlignmentWindow {
    AlignmentWindow {
        center: anchor_timestamp,
        half_width,
    }
}

/// `max(consecutive gaps) × (width_frames + 0.1)`
///
/// Fails with `InsufficientData` when no positive gap exists.
pub fn compute_half_width(
    primary_timestamps: &[f64],
    width_frames: f64,
) -> Result<f64, ContractError> {
    if primary_timestamps.len() < 2 {
        return Err(ContractError::insufficient_data(
            StreamKind::PrimaryVideo,
            format!(
                "at least 2 frames are needed to define a frame gap, got {}",
                primary_timestamps.len()
            ),
        ));
    }
    let max_gap = primary_timestamps
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::NEG_INFINITY, f64::max);
    if !(max_gap.is_finite() && max_gap > 0.0) {
        return Err(ContractError::insufficient_data(
            StreamKind::PrimaryVideo,
            format!("largest frame gap is {max_gap}, timestamps never advance"),
        ));
    }
    Ok(max_gap * (width_frames + WINDOW_MARGIN_FRAMES))
}

/// Pluggable half-width policy
pub trait WindowSizing: Send + Sync + std::fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Global half-width in seconds
    fn half_width(&self, primary: &TimestampIndex) -> Result<f64, ContractError>;
}

/// Half-width follows the coarsest primary frame spacing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxGapSizing {
    pub width_frames: f64,
}

impl WindowSizing for MaxGapSizing {
    fn name(&self) -> &'static str {
        "max_gap"
    }

    fn half_width(&self, primary: &TimestampIndex) -> Result<f64, ContractError> {
        compute_half_width(primary.timestamps(), self.width_frames)
    }
}

/// Constant half-width
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSizing {
    pub half_width_s: f64,
}

impl WindowSizing for FixedSizing {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn half_width(&self, _primary: &TimestampIndex) -> Result<f64, ContractError> {
        Ok(self.half_width_s)
    }
}

/// Build the configured sizing policy
pub fn sizing_from_config(settings: &WindowSettings) -> Box<dyn WindowSizing> {
    match settings.sizing {
        WindowSizingConfig::MaxGap => Box::new(MaxGapSizing {
            width_frames: settings.width_frames,
        }),
        WindowSizingConfig::Fixed { half_width_s } => Box::new(FixedSizing { half_width_s }),
    }
}

/// Holds the run-global half-width and recentres it per anchor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPlanner {
    half_width: f64,
}

impl WindowPlanner {
    /// Compute the half-width once with `sizing`
    pub fn new(sizing: &dyn WindowSizing, primary: &TimestampIndex) -> Result<Self, ContractError> {
        let half_width = sizing.half_width(primary)?;
        Ok(Self { half_width })
    }

    #[inline]
    pub fn half_width(&self) -> f64 {
        self.half_width
    }

    #[inline]
    pub fn window_for(&self, anchor_timestamp: f64) -> AlignmentWindow {
        window_for(anchor_timestamp, self.half_width)
    }

    /// Indices of `stream` inside the window
    pub fn indices_in(&self, window: &AlignmentWindow, stream: &TimestampIndex) -> Vec<usize> {
        stream.range_indices(window.lo(), window.hi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary(ts: &[f64]) -> TimestampIndex {
        TimestampIndex::new(StreamKind::PrimaryVideo, ts.to_vec()).unwrap()
    }

    #[test]
    fn test_half_width_uses_max_gap() {
        let hw = compute_half_width(&[0.0, 1.0, 2.0, 4.0, 5.0], 3.0).unwrap();
        assert!((hw - 2.0 * 3.1).abs() < 1e-12);
    }

    #[test]
    fn test_half_width_too_short() {
        let err = compute_half_width(&[1.0], 3.0).unwrap_err();
        assert!(matches!(
            err,
            ContractError::InsufficientData {
                stream: StreamKind::PrimaryVideo,
                ..
            }
        ));
    }

    #[test]
    fn test_half_width_constant_timestamps() {
        assert!(compute_half_width(&[2.0, 2.0, 2.0], 3.0).is_err());
    }

    #[test]
    fn test_half_width_positive_for_zero_frames() {
        let hw = compute_half_width(&[0.0, 0.5], 0.0).unwrap();
        assert!(hw > 0.0);
    }

    #[test]
    fn test_window_is_recentred_not_resized() {
        let ts: Vec<f64> = (0..10).map(f64::from).collect();
        let planner = WindowPlanner::new(&MaxGapSizing { width_frames: 3.0 }, &primary(&ts)).unwrap();

        let a = planner.window_for(2.0);
        let b = planner.window_for(7.0);
        assert_eq!(a.half_width, b.half_width);
        assert!((planner.window_for(5.0).lo() - 1.9).abs() < 1e-9);
        assert!((planner.window_for(5.0).hi() - 8.1).abs() < 1e-9);
    }

    #[test]
    fn test_window_half_open() {
        let w = window_for(1.0, 0.5);
        assert!(w.contains(0.5));
        assert!(w.contains(1.49));
        assert!(!w.contains(1.5));
    }

    #[test]
    fn test_fixed_sizing_ignores_gaps() {
        let planner = WindowPlanner::new(&FixedSizing { half_width_s: 0.25 }, &primary(&[0.0])).unwrap();
        assert_eq!(planner.half_width(), 0.25);
    }

    #[test]
    fn test_indices_in_window() {
        let audio = TimestampIndex::new(
            StreamKind::Audio,
            (0..100).map(|i| i as f64 * 0.1).collect(),
        )
        .unwrap();
        let planner = WindowPlanner::new(&FixedSizing { half_width_s: 0.5 }, &primary(&[0.0])).unwrap();
        let idx = planner.indices_in(&planner.window_for(5.05), &audio);
        assert_eq!(idx.first(), Some(&46));
        assert_eq!(idx.len(), 10);
    }

    #[test]
    fn test_sizing_from_config() {
        let settings = WindowSettings::default();
        assert_eq!(sizing_from_config(&settings).name(), "max_gap");

        let settings = WindowSettings {
            width_frames: 3.0,
            sizing: WindowSizingConfig::Fixed { half_width_s: 1.0 },
        };
        assert_eq!(sizing_from_config(&settings).name(), "fixed");
    }
}
