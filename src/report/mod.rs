//! Reporting utilities: residuals and terminal summaries.

pub mod format;

pub use format::*;

use crate::domain::FitResult;
use crate::error::{AnalysisError, AnalysisResult};
use crate::models::evaluate;

/// Observed minus fitted, per sample.
pub fn compute_residuals(x: &[f64], y: &[f64], fit: &FitResult) -> AnalysisResult<Vec<f64>> {
    if x.len() != y.len() {
        return Err(AnalysisError::InputShape(format!(
            "x has {} samples, y has {}",
            x.len(),
            y.len()
        )));
    }
    let fitted = evaluate(fit.model, x, &fit.params)?;
    if fitted.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::FitConvergence(
            "non-finite model prediction during residual computation".into(),
        ));
    }
    Ok(y.iter().zip(fitted).map(|(obs, f)| obs - f).collect())
}

/// The fit with the lowest SSE (first one on ties).
pub fn best_fit<'a, I>(fits: I) -> Option<&'a FitResult>
where
    I: IntoIterator<Item = &'a FitResult>,
{
    let mut best: Option<&FitResult> = None;
    for fit in fits {
        match best {
            Some(b) if fit.quality.sse >= b.quality.sse => {}
            _ => best = Some(fit),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitModel, FitQuality};

    fn line(a: f64, b: f64, sse: f64) -> FitResult {
        FitResult {
            model: FitModel::Linear,
            params: vec![a, b],
            uncertainties: vec![0.0, 0.0],
            quality: FitQuality {
                sse,
                rmse: 0.0,
                n: 3,
                iterations: 1,
            },
        }
    }

    #[test]
    fn residuals_are_observed_minus_fitted() {
        let r = compute_residuals(&[0.0, 1.0, 2.0], &[1.0, 3.5, 5.0], &line(2.0, 1.0, 0.0)).unwrap();
        assert_eq!(r, vec![0.0, 0.5, 0.0]);
    }

    #[test]
    fn best_fit_prefers_lowest_sse() {
        let fits = [line(1.0, 0.0, 2.0), line(2.0, 0.0, 0.5), line(3.0, 0.0, 0.5)];
        let best = best_fit(&fits).unwrap();
        assert_eq!(best.params[0], 2.0);
        let none: [FitResult; 0] = [];
        assert!(best_fit(&none).is_none());
    }
}
