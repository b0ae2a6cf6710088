//! Threshold trigger detection.
//!
//! The threshold is a fraction of the trace maximum. Samples at or above it
//! form a boolean mask whose first difference (the mask convolved with
//! `[1, −1]`) is `+1` on a rising edge and `−1` on a falling edge.

use crate::domain::{EdgeMode, EdgeSet, PulseSpacing};
use crate::error::{AnalysisError, AnalysisResult};
use crate::filter::convolve;

/// Threshold fraction used when the caller has no better value.
pub const DEFAULT_MODIFIER: f64 = 0.9;

/// Signed transitions of the thresholded mask.
struct Transitions {
    rising: Vec<usize>,
    falling: Vec<usize>,
}

fn transitions(data: &[f64], modifier: f64) -> AnalysisResult<Transitions> {
    if data.is_empty() {
        return Err(AnalysisError::InputShape("trigger signal is empty".into()));
    }
    if !(modifier > 0.0 && modifier <= 1.0) {
        return Err(AnalysisError::InvalidParameter(format!(
            "trigger modifier {modifier} must lie in (0, 1]"
        )));
    }

    let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let threshold = max * modifier;
    let mask: Vec<f64> = data
        .iter()
        .map(|&v| if v >= threshold { 1.0 } else { 0.0 })
        .collect();
    tracing::debug!(threshold, max, "trigger threshold");

    let diff = convolve(&mask, &[1.0, -1.0]);
    let mut out = Transitions {
        rising: Vec::new(),
        falling: Vec::new(),
    };
    for (i, d) in diff.into_iter().enumerate() {
        if d > 0.5 {
            out.rising.push(i);
        } else if d < -0.5 {
            out.falling.push(i);
        }
    }

    if out.rising.is_empty() {
        return Err(AnalysisError::ThresholdMiss { threshold, max });
    }
    Ok(out)
}

/// Locate trigger edges in `data`.
///
/// - `Rising`: the earliest rising edge
/// - `Falling`: the latest falling edge (may be `data.len()`)
/// - `Both`: every edge, sorted
pub fn find_trigger(data: &[f64], modifier: f64, mode: EdgeMode) -> AnalysisResult<EdgeSet> {
    let t = transitions(data, modifier)?;
    let indices = match mode {
        EdgeMode::Rising => t.rising.first().copied().into_iter().collect(),
        EdgeMode::Falling => t.falling.last().copied().into_iter().collect(),
        EdgeMode::Both => {
            let mut all = t.rising;
            all.extend(t.falling);
            all.sort_unstable();
            all
        }
    };
    Ok(EdgeSet { mode, indices })
}

/// Centres of a two-pulse trigger and, given `time`, their separation.
///
/// Each centre is the integer midpoint of a rise/fall pair. Exactly two
/// pulses are supported; any other count is an `UnsupportedPulseCount` error.
pub fn find_tau(y: &[f64], time: Option<&[f64]>, modifier: f64) -> AnalysisResult<PulseSpacing> {
    if let Some(t) = time {
        if t.len() != y.len() {
            return Err(AnalysisError::InputShape(format!(
                "trigger has {} samples, time has {}",
                y.len(),
                t.len()
            )));
        }
    }

    let edges = find_trigger(y, modifier, EdgeMode::Both)?;
    let centres: Vec<usize> = edges
        .indices
        .chunks_exact(2)
        .map(|pair| (pair[0] + pair[1]) / 2)
        .collect();

    let &[first, second] = centres.as_slice() else {
        return Err(AnalysisError::UnsupportedPulseCount {
            found: centres.len(),
        });
    };
    let tau = time.map(|t| t[second] - t[first]);
    Ok(PulseSpacing {
        centres: [first, second],
        tau,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulses(len: usize, centres: &[usize], width: usize) -> Vec<f64> {
        let mut y = vec![0.05; len];
        for &c in centres {
            for v in &mut y[c - width / 2..c + width / 2] {
                *v = 1.0;
            }
        }
        y
    }

    #[test]
    fn step_rising_edge_is_exact() {
        let k = 37;
        let data: Vec<f64> = (0..100).map(|i| if i < k { 0.2 } else { 2.0 }).collect();
        let edges = find_trigger(&data, 0.5, EdgeMode::Rising).unwrap();
        assert_eq!(edges.indices, vec![k]);
        assert_eq!(edges.first(), Some(k));
    }

    #[test]
    fn falling_edge_can_sit_past_the_end() {
        let data = [0.0, 0.0, 1.0, 1.0];
        let edges = find_trigger(&data, 0.9, EdgeMode::Falling).unwrap();
        assert_eq!(edges.indices, vec![4]);
    }

    #[test]
    fn both_edges_are_sorted() {
        let data = pulses(50, &[10, 30], 4);
        let edges = find_trigger(&data, DEFAULT_MODIFIER, EdgeMode::Both).unwrap();
        assert_eq!(edges.indices, vec![8, 12, 28, 32]);
    }

    #[test]
    fn negative_signal_misses_threshold() {
        let data = [-3.0, -2.0, -1.0];
        assert!(matches!(
            find_trigger(&data, 0.9, EdgeMode::Rising),
            Err(AnalysisError::ThresholdMiss { .. })
        ));
    }

    #[test]
    fn rejects_bad_modifier() {
        assert!(matches!(
            find_trigger(&[1.0], 0.0, EdgeMode::Rising),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn two_pulse_spacing() {
        let y = pulses(600, &[100, 400], 20);
        let time: Vec<f64> = (0..600).map(|i| i as f64 * 0.5e-9).collect();
        let spacing = find_tau(&y, Some(&time), 0.9).unwrap();
        assert_eq!(spacing.centres, [100, 400]);
        assert_eq!(spacing.tau, Some(time[400] - time[100]));
    }

    #[test]
    fn spacing_without_time() {
        let y = pulses(600, &[100, 400], 20);
        let spacing = find_tau(&y, None, 0.9).unwrap();
        assert_eq!(spacing.tau, None);
    }

    #[test]
    fn three_pulses_are_unsupported() {
        let y = pulses(600, &[100, 300, 500], 20);
        assert!(matches!(
            find_tau(&y, None, 0.9),
            Err(AnalysisError::UnsupportedPulseCount { found: 3 })
        ));
    }
}
