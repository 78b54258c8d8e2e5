//! Timing channel resolution.
//!
//! A [`TimingDecoder`] turns the raw pulse channel into a handful of
//! `(sample index, time)` anchors. [`TimingChannelResolver`] fits the linear
//! clock `t = a·i + b` through those anchors by least squares and evaluates
//! it at every sample, giving one timestamp per sensor sample.

use contracts::{ContractError, StreamKind, TimingConfig, TimingDecoderConfig};
use tracing::{debug, warn};

/// Relative deviation between fitted and nominal rate that gets a warning
const RATE_DRIFT_WARN: f64 = 0.01;

/// One decoded pulse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseAnchor {
    /// Sample index of the pulse
    pub sample: usize,
    /// Time the pulse stands for (seconds)
    pub time: f64,
}

/// Pulse decoding strategy
pub trait TimingDecoder: Send + Sync + std::fmt::Debug {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Decode pulse anchors from the raw channel
    fn decode(&self, pulses: &[f64]) -> Vec<PulseAnchor>;
}

/// Every rising edge is one tick of a fixed-period pulse clock
///
/// Edge `n` (counting from 0) is assigned `origin_s + n × period_s`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RisingEdgeDecoder {
    pub period_s: f64,
    pub origin_s: f64,
    /// Edge threshold; midpoint of the channel range when `None`
    pub threshold: Option<f64>,
}

impl RisingEdgeDecoder {
    pub fn new(period_s: f64, origin_s: f64) -> Self {
        Self {
            period_s,
            origin_s,
            threshold: None,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    fn effective_threshold(&self, pulses: &[f64]) -> Option<f64> {
        if let Some(t) = self.threshold {
            return Some(t);
        }
        let (lo, hi) = pulses
            .iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        // Flat or empty channel: nothing to detect.
        (hi > lo).then(|| lo + (hi - lo) / 2.0)
    }
}

impl TimingDecoder for RisingEdgeDecoder {
    fn name(&self) -> &'static str {
        "rising_edge"
    }

    fn decode(&self, pulses: &[f64]) -> Vec<PulseAnchor> {
        let Some(threshold) = self.effective_threshold(pulses) else {
            return Vec::new();
        };
        pulses
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] < threshold && w[1] >= threshold)
            .enumerate()
            .map(|(n, (i, _))| PulseAnchor {
                sample: i + 1,
                time: self.origin_s + n as f64 * self.period_s,
            })
            .collect()
    }
}

/// Build the configured decoder
pub fn decoder_from_config(config: &TimingDecoderConfig) -> Box<dyn TimingDecoder> {
    match *config {
        TimingDecoderConfig::RisingEdge {
            period_s,
            origin_s,
            threshold,
        } => Box::new(RisingEdgeDecoder {
            period_s,
            origin_s,
            threshold,
        }),
    }
}

/// Per-sample timestamps derived from the timing channel
#[derive(Debug, Clone)]
pub struct ResolvedTiming {
    /// One timestamp per sample, non-decreasing
    pub timestamps: Vec<f64>,
    /// Fitted seconds per sample
    pub slope: f64,
    /// Fitted time of sample 0
    pub intercept: f64,
    /// Pulses used for the fit
    pub anchors: usize,
    /// Largest deviation of a pulse from the fitted clock (seconds)
    pub max_residual: f64,
}

impl ResolvedTiming {
    /// Effective sampling rate of the fitted clock (Hz)
    pub fn effective_rate(&self) -> f64 {
        1.0 / self.slope
    }
}

/// Converts a pulse channel into sensor sample timestamps
#[derive(Debug)]
pub struct TimingChannelResolver {
    decoder: Box<dyn TimingDecoder>,
    tolerance_s: f64,
    max_residual_s: f64,
}

impl TimingChannelResolver {
    pub fn new(decoder: Box<dyn TimingDecoder>) -> Self {
        Self {
            decoder,
            tolerance_s: 0.001,
            max_residual_s: 0.0,
        }
    }

    pub fn from_config(config: &TimingConfig) -> Self {
        Self::new(decoder_from_config(&config.decoder))
            .with_tolerance(config.tolerance_s)
            .with_max_residual(config.max_residual_s)
    }

    /// Allowed backwards step between consecutive pulse times
    pub fn with_tolerance(mut self, tolerance_s: f64) -> Self {
        self.tolerance_s = tolerance_s;
        self
    }

    /// Largest allowed pulse deviation from the fit (0 disables the check)
    pub fn with_max_residual(mut self, max_residual_s: f64) -> Self {
        self.max_residual_s = max_residual_s;
        self
    }

    /// Resolve timestamps for every sample of `pulses`
    ///
    /// `sampling_rate` is the recording's nominal rate; the fitted clock is
    /// authoritative and a large disagreement is only logged.
    pub fn resolve(
        &self,
        channel: &str,
        pulses: &[f64],
        sampling_rate: f64,
    ) -> Result<ResolvedTiming, ContractError> {
        if pulses.is_empty() {
            return Err(ContractError::EmptyStream {
                stream: StreamKind::Sensor,
            });
        }
        if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
            return Err(ContractError::malformed_timing(
                channel,
                format!("sampling rate must be > 0, got {sampling_rate}"),
            ));
        }

        let anchors = self.decoder.decode(pulses);
        if anchors.len() < 2 {
            return Err(ContractError::malformed_timing(
                channel,
                format!(
                    "{} decoder found {} pulses, at least 2 required",
                    self.decoder.name(),
                    anchors.len()
                ),
            ));
        }

        for pair in anchors.windows(2) {
            if pair[1].time < pair[0].time - self.tolerance_s {
                return Err(ContractError::malformed_timing(
                    channel,
                    format!(
                        "pulse time goes backwards at sample {}: {:.6} s after {:.6} s",
                        pair[1].sample, pair[1].time, pair[0].time
                    ),
                ));
            }
        }

        let (slope, intercept) = fit_line(&anchors);
        if !(slope.is_finite() && slope > 0.0 && intercept.is_finite()) {
            return Err(ContractError::malformed_timing(
                channel,
                format!("fitted clock is not increasing (slope {slope})"),
            ));
        }

        let max_residual = anchors
            .iter()
            .map(|a| (a.time - (slope * a.sample as f64 + intercept)).abs())
            .fold(0.0, f64::max);
        if self.max_residual_s > 0.0 && max_residual > self.max_residual_s {
            return Err(ContractError::malformed_timing(
                channel,
                format!(
                    "pulse deviates {max_residual:.6} s from the fitted clock (limit {:.6} s)",
                    self.max_residual_s
                ),
            ));
        }

        let effective_rate = 1.0 / slope;
        if ((effective_rate - sampling_rate) / sampling_rate).abs() > RATE_DRIFT_WARN {
            warn!(
                channel,
                nominal_hz = sampling_rate,
                effective_hz = effective_rate,
                "timing channel rate differs from nominal sampling rate"
            );
        }

        debug!(
            channel,
            decoder = self.decoder.name(),
            anchors = anchors.len(),
            slope,
            intercept,
            max_residual,
            "timing channel resolved"
        );

        let timestamps = (0..pulses.len())
            .map(|i| slope * i as f64 + intercept)
            .collect();

        Ok(ResolvedTiming {
            timestamps,
            slope,
            intercept,
            anchors: anchors.len(),
            max_residual,
        })
    }
}

/// Least-squares line `time = a·sample + b`
fn fit_line(anchors: &[PulseAnchor]) -> (f64, f64) {
    let n = anchors.len() as f64;
    let mean_x = anchors.iter().map(|a| a.sample as f64).sum::<f64>() / n;
    let mean_y = anchors.iter().map(|a| a.time).sum::<f64>() / n;

    let (sxx, sxy) = anchors.iter().fold((0.0, 0.0), |(sxx, sxy), a| {
        let dx = a.sample as f64 - mean_x;
        (sxx + dx * dx, sxy + dx * (a.time - mean_y))
    });

    let slope = sxy / sxx;
    (slope, mean_y - slope * mean_x)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Square wave: high for `high` samples every `period` samples, first
    /// edge at `first`
    fn square(n: usize, first: usize, period: usize, high: usize) -> Vec<f64> {
        (0..n)
            .map(|i| {
                if i >= first && (i - first) % period < high {
                    5.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    #[test]
    fn test_rising_edges() {
        let pulses = square(40, 5, 10, 3);
        let anchors = RisingEdgeDecoder::new(0.1, 1.0).decode(&pulses);
        let samples: Vec<usize> = anchors.iter().map(|a| a.sample).collect();
        assert_eq!(samples, vec![5, 15, 25, 35]);
        assert!((anchors[3].time - 1.3).abs() < 1e-12);
    }

    #[test]
    fn test_flat_channel_has_no_edges() {
        let anchors = RisingEdgeDecoder::new(1.0, 0.0).decode(&[1.0; 20]);
        assert!(anchors.is_empty());
    }

    #[test]
    fn test_explicit_threshold() {
        let pulses = vec![0.0, 1.0, 0.0, 3.0, 0.0, 1.0];
        let anchors = RisingEdgeDecoder::new(1.0, 0.0)
            .with_threshold(2.0)
            .decode(&pulses);
        assert_eq!(anchors.len(), 1);
        assert_eq!(anchors[0].sample, 3);
    }

    #[test]
    fn test_resolve_linear_clock() {
        // 10 samples per 0.1 s pulse, first edge at sample 5 → t = 1.0
        let pulses = square(60, 5, 10, 5);
        let resolver = TimingChannelResolver::new(Box::new(RisingEdgeDecoder::new(0.1, 1.0)))
            .with_max_residual(1e-6);
        let timing = resolver.resolve("STI 006", &pulses, 100.0).unwrap();

        assert_eq!(timing.timestamps.len(), pulses.len());
        assert!(timing.timestamps.windows(2).all(|w| w[0] <= w[1]));
        assert!((timing.timestamps[5] - 1.0).abs() < 1e-9);
        assert!((timing.timestamps[0] - 0.95).abs() < 1e-9);
        assert!((timing.effective_rate() - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_pulse_is_malformed() {
        let pulses = square(20, 5, 100, 5);
        let resolver = TimingChannelResolver::new(Box::new(RisingEdgeDecoder::new(1.0, 0.0)));
        let err = resolver.resolve("STI 006", &pulses, 100.0).unwrap_err();
        assert!(matches!(err, ContractError::MalformedTimingChannel { .. }));
        assert!(err.to_string().contains("STI 006"));
    }

    #[test]
    fn test_negative_period_is_malformed() {
        let pulses = square(60, 5, 10, 5);
        let resolver = TimingChannelResolver::new(Box::new(RisingEdgeDecoder::new(-0.1, 0.0)));
        let err = resolver.resolve("STI 006", &pulses, 100.0).unwrap_err();
        assert!(err.to_string().contains("backwards"), "got: {err}");
    }

    #[test]
    fn test_irregular_pulses_exceed_residual() {
        // Edges at 5, 15, 40, 50 but a constant period: not a linear clock.
        let mut pulses = vec![0.0; 60];
        for start in [5, 15, 40, 50] {
            pulses[start] = 5.0;
        }
        let resolver = TimingChannelResolver::new(Box::new(RisingEdgeDecoder::new(0.1, 0.0)))
            .with_max_residual(0.005);
        let err = resolver.resolve("STI 006", &pulses, 100.0).unwrap_err();
        assert!(err.to_string().contains("fitted clock"), "got: {err}");

        // Disabled check accepts the same channel.
        let lenient = TimingChannelResolver::new(Box::new(RisingEdgeDecoder::new(0.1, 0.0)));
        assert!(lenient.resolve("STI 006", &pulses, 100.0).is_ok());
    }

    #[test]
    fn test_empty_channel() {
        let resolver = TimingChannelResolver::new(Box::new(RisingEdgeDecoder::new(1.0, 0.0)));
        let err = resolver.resolve("STI 006", &[], 100.0).unwrap_err();
        assert!(matches!(err, ContractError::EmptyStream { .. }));
    }

    #[test]
    fn test_from_config() {
        let resolver = TimingChannelResolver::from_config(&TimingConfig::default());
        assert_eq!(resolver.decoder.name(), "rising_edge");
        assert_eq!(resolver.max_residual_s, 0.005);
    }
}
