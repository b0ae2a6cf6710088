//! Local-maximum peak finding with height and prominence criteria.
//!
//! Semantics follow the usual `find_peaks` conventions:
//! - a peak is a sample (or flat plateau) strictly higher than both neighbours;
//!   plateaus report their midpoint, rounded down
//! - the first and last samples are never peaks
//! - prominence is the peak height above the higher of the two lowest points
//!   reached before the signal climbs above the peak on either side

use serde::Serialize;

use crate::error::{AnalysisError, AnalysisResult};
use crate::math::window_indices;

/// Minimum requirements a local maximum must meet to count as a peak.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakCriteria {
    pub height: Option<f64>,
    pub prominence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub index: usize,
    pub value: f64,
    pub prominence: f64,
}

/// Plateau-aware local maxima, as midpoint indices.
fn local_maxima(y: &[f64]) -> Vec<usize> {
    let n = y.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }

    let mut i = 1;
    let i_max = n - 1;
    while i < i_max {
        if y[i - 1] < y[i] {
            let mut ahead = i + 1;
            while ahead < i_max && y[ahead] == y[i] {
                ahead += 1;
            }
            if y[ahead] < y[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

fn prominence(y: &[f64], peak: usize) -> f64 {
    let top = y[peak];

    let mut left_min = top;
    for &v in y[..=peak].iter().rev() {
        if v > top {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = top;
    for &v in &y[peak..] {
        if v > top {
            break;
        }
        right_min = right_min.min(v);
    }

    top - left_min.max(right_min)
}

/// Peaks of `y` satisfying `criteria`, in index order.
pub fn find_peaks(y: &[f64], criteria: PeakCriteria) -> Vec<Peak> {
    local_maxima(y)
        .into_iter()
        .filter(|&i| criteria.height.is_none_or(|h| y[i] >= h))
        .map(|i| Peak {
            index: i,
            value: y[i],
            prominence: prominence(y, i),
        })
        .filter(|p| criteria.prominence.is_none_or(|min| p.prominence >= min))
        .collect()
}

/// Peak indices of `y`, optionally restricted to an x-window.
///
/// `x_window` bounds are resolved to the nearest samples of `x` (inclusive).
/// `prominence_frac` and `height_frac` are fractions of the maximum of `y`
/// inside the window. Returned indices are absolute positions in `y`.
pub fn peak_find(
    y: &[f64],
    x: Option<&[f64]>,
    prominence_frac: Option<f64>,
    height_frac: Option<f64>,
    x_window: Option<(f64, f64)>,
) -> AnalysisResult<Vec<usize>> {
    if y.is_empty() {
        return Err(AnalysisError::InputShape("cannot search an empty array for peaks".into()));
    }
    if let Some(x) = x {
        if x.len() != y.len() {
            return Err(AnalysisError::InputShape(format!(
                "peak search has {} values but {} x samples",
                y.len(),
                x.len()
            )));
        }
    }

    let (lo, hi) = match x_window {
        Some(bounds) => {
            let x = x.ok_or_else(|| {
                AnalysisError::InvalidParameter("an x-window needs x samples".into())
            })?;
            window_indices(x, bounds)?
        }
        None => (0, y.len() - 1),
    };

    let window = &y[lo..=hi];
    let local_max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let criteria = PeakCriteria {
        height: height_frac.map(|f| f * local_max),
        prominence: prominence_frac.map(|f| f * local_max),
    };
    tracing::debug!(lo, hi, local_max, ?criteria, "peak search window");

    Ok(find_peaks(window, criteria)
        .into_iter()
        .map(|p| p.index + lo)
        .collect())
}
