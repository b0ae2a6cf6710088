//! Windowed-sinc and moving-average kernel design.
//!
//! All cutoffs are normalised frequencies (cycles per sample), so a valid
//! cutoff lies strictly inside `(0, 0.5)`.
//!
//! | kernel        | construction                                   | gain        |
//! |---------------|------------------------------------------------|-------------|
//! | low-pass      | Blackman × sinc, scaled to unit sum            | DC = 1      |
//! | high-pass     | spectral inversion of the low-pass             | DC = 0      |
//! | band-pass     | low-pass ∗ high-pass                           | centre = 1  |
//! | moving average| uniform / Gaussian / Blackman window           | DC = 1      |

use serde::Serialize;

use super::condition::convolve;
use super::window::{MovingAverageShape, blackman, odd_length, shape_window, sinc_response};
use crate::error::{AnalysisError, AnalysisResult};

/// How a kernel was built; carried along for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KernelKind {
    LowPass { cutoff: f64 },
    HighPass { cutoff: f64 },
    BandPass { lower: f64, upper: f64 },
    MovingAverage { shape: MovingAverageShape },
}

/// An odd-length FIR kernel, symmetric about its centre tap.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterKernel {
    kind: KernelKind,
    taps: Vec<f64>,
}

impl FilterKernel {
    pub fn kind(&self) -> KernelKind {
        self.kind
    }

    pub fn taps(&self) -> &[f64] {
        &self.taps
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Index of the centre tap (group delay in samples).
    pub fn centre(&self) -> usize {
        self.taps.len() / 2
    }

    pub fn sum(&self) -> f64 {
        self.taps.iter().sum()
    }

    /// Magnitude of the frequency response at normalised frequency `f`.
    ///
    /// Uses the zero-phase form `Σ h[n]·cos(2πf(n − centre))`, which is exact
    /// for symmetric kernels.
    pub fn gain_at(&self, f: f64) -> f64 {
        let centre = self.centre() as f64;
        let w = 2.0 * std::f64::consts::PI * f;
        self.taps
            .iter()
            .enumerate()
            .map(|(i, h)| h * (w * (i as f64 - centre)).cos())
            .sum()
    }
}

fn check_length(n: usize) -> AnalysisResult<()> {
    if n == 0 {
        return Err(AnalysisError::InvalidParameter(
            "kernel length must be at least 1".into(),
        ));
    }
    Ok(())
}

fn check_cutoff(fc: f64) -> AnalysisResult<()> {
    if !(fc > 0.0 && fc < 0.5) {
        return Err(AnalysisError::InvalidParameter(format!(
            "cutoff {fc} is not a normalised frequency in (0, 0.5)"
        )));
    }
    Ok(())
}

fn scale_to_unit_sum(taps: &mut [f64]) -> AnalysisResult<()> {
    let sum: f64 = taps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return Err(AnalysisError::InvalidParameter(format!(
            "kernel sum {sum} cannot be normalised"
        )));
    }
    for t in taps.iter_mut() {
        *t /= sum;
    }
    Ok(())
}

/// Windowed-sinc low-pass with unit DC gain.
pub fn low_pass(n: usize, fc: f64) -> AnalysisResult<FilterKernel> {
    check_length(n)?;
    check_cutoff(fc)?;

    let mut taps: Vec<f64> = sinc_response(n, fc)
        .into_iter()
        .zip(blackman(n))
        .map(|(s, w)| s * w)
        .collect();
    scale_to_unit_sum(&mut taps)?;

    tracing::debug!(len = taps.len(), cutoff = fc, "designed low-pass kernel");
    Ok(FilterKernel {
        kind: KernelKind::LowPass { cutoff: fc },
        taps,
    })
}

/// Spectral inversion of [`low_pass`]: DC gain 0, Nyquist gain 1.
pub fn high_pass(n: usize, fc: f64) -> AnalysisResult<FilterKernel> {
    let lp = low_pass(n, fc)?;
    let centre = lp.centre();
    let mut taps: Vec<f64> = lp.taps.iter().map(|t| -t).collect();
    taps[centre] += 1.0;

    tracing::debug!(len = taps.len(), cutoff = fc, "designed high-pass kernel");
    Ok(FilterKernel {
        kind: KernelKind::HighPass { cutoff: fc },
        taps,
    })
}

/// Band-pass between `lower` and `upper`, built as
/// `low_pass(n_low, upper) ∗ high_pass(n_high, lower)`.
///
/// A band-pass blocks DC, so the result is rescaled to unit gain at the
/// centre of the pass band, `(lower + upper) / 2`. The caller must supply
/// `lower < upper`.
pub fn band_pass(n_low: usize, upper: f64, n_high: usize, lower: f64) -> AnalysisResult<FilterKernel> {
    let lp = low_pass(n_low, upper)?;
    let hp = high_pass(n_high, lower)?;
    let mut kernel = FilterKernel {
        kind: KernelKind::BandPass { lower, upper },
        taps: convolve(lp.taps(), hp.taps()),
    };

    let gain = kernel.gain_at(0.5 * (lower + upper));
    if gain.abs() < f64::EPSILON || !gain.is_finite() {
        return Err(AnalysisError::InvalidParameter(format!(
            "band {lower}..{upper} has no pass band to normalise"
        )));
    }
    for t in kernel.taps.iter_mut() {
        *t /= gain;
    }

    tracing::debug!(len = kernel.len(), lower, upper, "designed band-pass kernel");
    Ok(kernel)
}

/// Unit-sum moving-average kernel.
pub fn moving_average(n: usize, shape: MovingAverageShape) -> AnalysisResult<FilterKernel> {
    check_length(n)?;
    let mut taps = shape_window(n, shape);
    scale_to_unit_sum(&mut taps)?;
    debug_assert_eq!(taps.len(), odd_length(n));

    Ok(FilterKernel {
        kind: KernelKind::MovingAverage { shape },
        taps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn low_pass_has_unit_dc_gain() {
        for n in [11, 50, 101] {
            let k = low_pass(n, 0.1).unwrap();
            assert_eq!(k.len() % 2, 1);
            assert_approx_eq!(k.sum(), 1.0, 1e-9);
        }
    }

    #[test]
    fn high_pass_blocks_dc_and_passes_nyquist() {
        let k = high_pass(101, 0.1).unwrap();
        assert!(k.sum().abs() < 1e-9);
        assert_approx_eq!(k.gain_at(0.5), 1.0, 1e-3);
    }

    #[test]
    fn low_and_high_pass_are_complementary() {
        let lp = low_pass(31, 0.2).unwrap();
        let hp = high_pass(31, 0.2).unwrap();
        for (i, (a, b)) in lp.taps().iter().zip(hp.taps()).enumerate() {
            let expected = if i == lp.centre() { 1.0 } else { 0.0 };
            assert_approx_eq!(a + b, expected, 1e-12);
        }
    }

    #[test]
    fn band_pass_has_unit_centre_gain_and_blocks_dc() {
        let k = band_pass(101, 0.3, 101, 0.1).unwrap();
        assert_eq!(k.len(), 201);
        assert_approx_eq!(k.gain_at(0.2), 1.0, 1e-9);
        assert!(k.sum().abs() < 1e-6);
    }

    #[test]
    fn rejects_bad_cutoffs_and_lengths() {
        for fc in [0.0, 0.5, -0.1, f64::NAN] {
            assert!(matches!(
                low_pass(11, fc),
                Err(AnalysisError::InvalidParameter(_))
            ));
        }
        assert!(low_pass(0, 0.1).is_err());
        assert!(moving_average(0, MovingAverageShape::Uniform).is_err());
    }

    #[test]
    fn moving_averages_are_unit_sum() {
        for shape in [
            MovingAverageShape::Uniform,
            MovingAverageShape::Gaussian,
            MovingAverageShape::Blackman,
        ] {
            let k = moving_average(6, shape).unwrap();
            assert_eq!(k.len(), 7);
            assert_approx_eq!(k.sum(), 1.0, 1e-12);
        }
    }
}
