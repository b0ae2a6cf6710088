//! Small scalar/array helpers shared by the pulse-area and detection code.

use crate::error::{AnalysisError, AnalysisResult};

/// `(a − control) / reference`.
///
/// Fails when `reference` is zero or non-finite; callers never get a silent
/// `inf`/`NaN` ratio.
pub fn normalise(a: f64, reference: f64, control: f64) -> AnalysisResult<f64> {
    if reference == 0.0 || !reference.is_finite() {
        return Err(AnalysisError::InvalidParameter(format!(
            "cannot normalise by reference {reference}"
        )));
    }
    Ok((a - control) / reference)
}

/// Optical depth `ln(reference · correction / transmitted)`.
pub fn optical_depth(reference: f64, transmitted: f64, correction: f64) -> AnalysisResult<f64> {
    let ratio = reference * correction / transmitted;
    if !(ratio.is_finite() && ratio > 0.0) {
        return Err(AnalysisError::InvalidParameter(format!(
            "optical depth undefined for reference={reference}, transmitted={transmitted}, correction={correction}"
        )));
    }
    Ok(ratio.ln())
}

/// Element-wise mean of equally sized arrays, skipping any array that holds a
/// non-finite value.
pub fn average_arrays(arrays: &[Vec<f64>]) -> AnalysisResult<Vec<f64>> {
    let Some(first) = arrays.first() else {
        return Err(AnalysisError::EmptyAverage { count: 0 });
    };
    let len = first.len();
    if let Some(bad) = arrays.iter().find(|a| a.len() != len) {
        return Err(AnalysisError::InputShape(format!(
            "cannot average arrays of length {len} and {}",
            bad.len()
        )));
    }

    let mut sum = vec![0.0; len];
    let mut used = 0usize;
    for array in arrays {
        if array.iter().any(|v| !v.is_finite()) {
            continue;
        }
        for (acc, v) in sum.iter_mut().zip(array) {
            *acc += v;
        }
        used += 1;
    }

    if used == 0 {
        return Err(AnalysisError::EmptyAverage {
            count: arrays.len(),
        });
    }
    if used < arrays.len() {
        tracing::warn!(
            skipped = arrays.len() - used,
            total = arrays.len(),
            "skipping non-finite arrays in average"
        );
    }

    let scale = used as f64;
    Ok(sum.into_iter().map(|v| v / scale).collect())
}

/// Mean of the samples in the most populated of `bins` equal-width bins.
///
/// The maximum sample falls in the last bin; ties between bins resolve to the
/// lowest one.
pub fn bin_mean(data: &[f64], bins: usize) -> AnalysisResult<f64> {
    if bins == 0 {
        return Err(AnalysisError::InvalidParameter("bin count must be > 0".into()));
    }
    if data.is_empty() {
        return Err(AnalysisError::InputShape("cannot bin an empty array".into()));
    }
    if data.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::InputShape("cannot bin non-finite data".into()));
    }

    let min = data.iter().copied().fold(f64::INFINITY, f64::min);
    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = (max - min) / bins as f64;
    if width <= 0.0 {
        return Ok(min);
    }

    let bin_of = |v: f64| (((v - min) / width) as usize).min(bins - 1);
    let mut counts = vec![0usize; bins];
    for &v in data {
        counts[bin_of(v)] += 1;
    }

    let mut best = 0;
    for (i, &c) in counts.iter().enumerate() {
        if c > counts[best] {
            best = i;
        }
    }

    let (sum, n) = data
        .iter()
        .filter(|&&v| bin_of(v) == best)
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    Ok(sum / n as f64)
}

/// Index of the sample closest to `value` (first one on ties).
pub fn nearest_index(x: &[f64], value: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &xi) in x.iter().enumerate() {
        let d = (xi - value).abs();
        if !d.is_finite() {
            continue;
        }
        match best {
            Some((_, bd)) if d >= bd => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Inclusive index range `(start, stop)` closest to the bounds `(lo, hi)`.
pub fn window_indices(x: &[f64], bounds: (f64, f64)) -> AnalysisResult<(usize, usize)> {
    let lookup = |v: f64| {
        nearest_index(x, v).ok_or_else(|| {
            AnalysisError::InputShape(format!("no finite sample near {v} to anchor window"))
        })
    };
    let a = lookup(bounds.0)?;
    let b = lookup(bounds.1)?;
    Ok((a.min(b), a.max(b)))
}
