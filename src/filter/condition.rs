//! Delay-compensated FIR filtering.
//!
//! A full linear convolution of `K` taps with `N` samples has `N + K − 1`
//! points and lags the input by `K/2` samples. Trimming `K/2` points from each
//! end of an odd-length kernel's output cancels that lag and returns exactly
//! `N` samples aligned with the input. Samples past either edge are zero.

use super::kernel::{FilterKernel, moving_average};
use super::window::MovingAverageShape;
use crate::error::{AnalysisError, AnalysisResult};

/// Full linear convolution, `len(a) + len(b) − 1` points.
pub fn convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            out[i + j] += ai * bj;
        }
    }
    out
}

/// Filter `data` with a designed kernel; the output has `data.len()` samples.
pub fn condition(kernel: &FilterKernel, data: &[f64]) -> Vec<f64> {
    same_length(kernel.taps(), data)
}

/// Like [`condition`] for an arbitrary tap vector, which must have odd length.
pub fn condition_with(taps: &[f64], data: &[f64]) -> AnalysisResult<Vec<f64>> {
    if taps.len() % 2 == 0 {
        return Err(AnalysisError::InputShape(format!(
            "kernel needs odd length for delay compensation, got {}",
            taps.len()
        )));
    }
    Ok(same_length(taps, data))
}

/// Moving-average smoothing: `condition(moving_average(n, shape), data)`.
pub fn smooth(data: &[f64], n: usize, shape: MovingAverageShape) -> AnalysisResult<Vec<f64>> {
    let kernel = moving_average(n, shape)?;
    Ok(condition(&kernel, data))
}

// Centre slice of the full convolution, computed directly.
fn same_length(taps: &[f64], data: &[f64]) -> Vec<f64> {
    let half = taps.len() / 2;
    let n = data.len();
    (0..n)
        .map(|i| {
            // full[i + half] = Σ_k taps[k] · data[i + half − k]
            let pos = i + half;
            let k_lo = pos.saturating_sub(n - 1);
            let k_hi = pos.min(taps.len() - 1);
            (k_lo..=k_hi).map(|k| taps[k] * data[pos - k]).sum()
        })
        .collect()
}
