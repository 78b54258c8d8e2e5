//! Percentile-based amplitude scaling.

use contracts::StreamKind;
use tracing::warn;

/// Run-global normaliser for one dense stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeScale {
    value: f64,
}

impl AmplitudeScale {
    /// Scale from an explicit value; non-positive values fall back to 1.0
    pub fn new(value: f64) -> Self {
        if value.is_finite() && value > 0.0 {
            Self { value }
        } else {
            Self { value: 1.0 }
        }
    }

    /// `percentile(|samples|, p) × margin`
    ///
    /// A silent (all zero or all non-finite) stream would give a zero scale;
    /// it falls back to 1.0 so normalisation never divides by zero.
    pub fn from_percentile(stream: StreamKind, samples: &[f64], percentile: f64, margin: f64) -> Self {
        let magnitudes: Vec<f64> = samples
            .iter()
            .filter(|v| v.is_finite())
            .map(|v| v.abs())
            .collect();
        let value = percentile_of(magnitudes, percentile).map(|p| p * margin);

        match value {
            Some(v) if v.is_finite() && v > 0.0 => Self { value: v },
            _ => {
                warn!(
                    stream = %stream,
                    percentile,
                    "amplitude scale is zero, using 1.0"
                );
                Self { value: 1.0 }
            }
        }
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Map a sample into display units (±1 nominal)
    #[inline]
    pub fn normalize(&self, sample: f64) -> f64 {
        sample / self.value
    }
}

/// Linear-interpolated percentile, `p` in `[0, 100]`
///
/// Same convention as numpy's default: rank `p/100 × (n - 1)` between the
/// two nearest order statistics.
pub fn percentile_of(mut values: Vec<f64>, p: f64) -> Option<f64> {
    if values.is_empty() || p.is_nan() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(values[lo] + (values[hi] - values[lo]) * frac)
}
