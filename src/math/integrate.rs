//! Quadrature over sampled data with possibly non-uniform spacing.
//!
//! Composite Simpson uses the non-uniform three-point rule on consecutive
//! interval pairs. With an odd number of intervals the final interval is
//! closed with Cartwright's correction, so the rule stays exact for quadratics.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, AnalysisResult};

/// Quadrature rule used for pulse areas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Quadrature {
    #[default]
    Simpson,
    Trapezoid,
}

pub fn integrate(rule: Quadrature, y: &[f64], x: &[f64]) -> AnalysisResult<f64> {
    match rule {
        Quadrature::Simpson => simpson(y, x),
        Quadrature::Trapezoid => trapezoid(y, x),
    }
}

fn check_lengths(y: &[f64], x: &[f64]) -> AnalysisResult<()> {
    if y.len() != x.len() {
        return Err(AnalysisError::InputShape(format!(
            "integrand has {} samples, abscissa has {}",
            y.len(),
            x.len()
        )));
    }
    if y.is_empty() {
        return Err(AnalysisError::InputShape("cannot integrate zero samples".into()));
    }
    Ok(())
}

/// Composite trapezoid rule.
pub fn trapezoid(y: &[f64], x: &[f64]) -> AnalysisResult<f64> {
    check_lengths(y, x)?;
    Ok(x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| 0.5 * (xw[1] - xw[0]) * (yw[0] + yw[1]))
        .sum())
}

/// Composite Simpson rule tolerant of non-uniform sampling.
pub fn simpson(y: &[f64], x: &[f64]) -> AnalysisResult<f64> {
    check_lengths(y, x)?;
    let n = y.len();
    match n {
        1 => return Ok(0.0),
        2 => return trapezoid(y, x),
        _ => {}
    }

    if n % 2 == 1 {
        return Ok(simpson_pairs(y, x));
    }

    // Even sample count: Simpson on the first n-1 samples, then correct for
    // the last interval using the final three samples.
    let mut total = simpson_pairs(&y[..n - 1], &x[..n - 1]);
    let h0 = x[n - 2] - x[n - 3];
    let h1 = x[n - 1] - x[n - 2];
    let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
    let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
    let eta = (h1 * h1 * h1) / (6.0 * h0 * (h0 + h1));
    total += alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3];
    Ok(total)
}

/// Simpson over an odd number of samples (even number of intervals).
fn simpson_pairs(y: &[f64], x: &[f64]) -> f64 {
    let mut total = 0.0;
    let mut i = 0;
    while i + 2 < y.len() {
        let h0 = x[i + 1] - x[i];
        let h1 = x[i + 2] - x[i + 1];
        let hsum = h0 + h1;
        let hprod = h0 * h1;
        let h0_over_h1 = h0 / h1;
        total += hsum / 6.0
            * (y[i] * (2.0 - 1.0 / h0_over_h1)
                + y[i + 1] * (hsum * hsum / hprod)
                + y[i + 2] * (2.0 - h0_over_h1));
        i += 2;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn simpson_three_point_triangle() {
        let area = simpson(&[0.0, 1.0, 0.0], &[0.0, 1.0, 2.0]).unwrap();
        assert_approx_eq!(area, 4.0 / 3.0, 1e-12);
    }

    #[test]
    fn trapezoid_three_point_triangle() {
        let area = trapezoid(&[0.0, 1.0, 0.0], &[0.0, 1.0, 2.0]).unwrap();
        assert_approx_eq!(area, 1.0, 1e-12);
    }

    #[test]
    fn simpson_exact_for_quadratic_with_even_samples() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y: Vec<f64> = x.iter().map(|v| v * v).collect();
        assert_approx_eq!(simpson(&y, &x).unwrap(), 9.0, 1e-12);
    }

    #[test]
    fn simpson_exact_for_quadratic_on_non_uniform_grid() {
        let x = [0.0, 0.3, 1.0, 1.2, 2.5];
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v * v - v + 1.0).collect();
        // ∫0^2.5 (2x² − x + 1) dx = 2/3·15.625 − 3.125 + 2.5
        let exact = 2.0 / 3.0 * 15.625 - 3.125 + 2.5;
        assert_approx_eq!(simpson(&y, &x).unwrap(), exact, 1e-10);
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert!(matches!(
            simpson(&[1.0, 2.0], &[0.0]),
            Err(AnalysisError::InputShape(_))
        ));
    }

    #[test]
    fn degenerate_sample_counts() {
        assert_eq!(simpson(&[3.0], &[1.0]).unwrap(), 0.0);
        assert_approx_eq!(simpson(&[1.0, 3.0], &[0.0, 2.0]).unwrap(), 4.0, 1e-12);
    }
}
