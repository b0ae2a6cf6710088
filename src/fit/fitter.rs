//! Curve fitting front end.
//!
//! Given:
//! - a [`FitModel`]
//! - observations `(x_i, y_i)`
//! - an optional initial guess, solver selector and per-parameter box
//!
//! we run one least-squares solve and return the parameters with their
//! one-sigma uncertainties `sqrt(diag(s²(JᵀJ)⁻¹))`.
//!
//! There is no internal retry. A failed solve is reported as
//! `FitConvergence`; a better guess or a different method is the caller's
//! remedy. A singular covariance is not a failure: the parameters are kept and
//! the uncertainties are NaN.

use clap::ValueEnum;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::lm::{LmConfig, minimize};
use crate::domain::{FitModel, FitQuality, FitResult};
use crate::error::{AnalysisError, AnalysisResult};
use crate::math::covariance;

/// Which solver variant to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SolverMethod {
    /// Bounded when any finite bound is supplied, plain otherwise.
    #[default]
    Auto,
    /// Unconstrained Levenberg–Marquardt; rejects finite bounds.
    LevenbergMarquardt,
    /// Levenberg–Marquardt with every trial point projected onto the box.
    BoundedLevenbergMarquardt,
}

/// Per-parameter box `lower[j] ≤ p[j] ≤ upper[j]`; infinities mean "free".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

impl Bounds {
    /// Build a box; `lower > upper` anywhere leaves no feasible point.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> AnalysisResult<Self> {
        if lower.len() != upper.len() {
            return Err(AnalysisError::InputShape(format!(
                "bounds have {} lower and {} upper entries",
                lower.len(),
                upper.len()
            )));
        }
        if lower.iter().chain(&upper).any(|v| v.is_nan()) {
            return Err(AnalysisError::InvalidParameter("bounds must not be NaN".into()));
        }
        if let Some(j) = lower.iter().zip(&upper).position(|(lo, hi)| lo > hi) {
            return Err(AnalysisError::FitConvergence(format!(
                "infeasible bounds for parameter {j}: lower {} > upper {}",
                lower[j], upper[j]
            )));
        }
        Ok(Self { lower, upper })
    }

    /// The same `(lower, upper)` pair for every one of `n` parameters.
    pub fn uniform(lower: f64, upper: f64, n: usize) -> AnalysisResult<Self> {
        Self::new(vec![lower; n], vec![upper; n])
    }

    pub fn len(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn has_finite(&self) -> bool {
        self.lower.iter().chain(&self.upper).any(|v| v.is_finite())
    }

    pub fn contains(&self, p: &[f64]) -> bool {
        p.iter()
            .zip(self.lower.iter().zip(&self.upper))
            .all(|(v, (lo, hi))| v >= lo && v <= hi)
    }

    /// Clamp `p` onto the box.
    pub fn project(&self, p: &mut [f64]) {
        for (v, (lo, hi)) in p.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            *v = v.clamp(*lo, *hi);
        }
    }
}

/// Options for a single [`curve_fit`] call.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Starting point; all ones when absent.
    pub initial_guess: Option<Vec<f64>>,
    pub method: SolverMethod,
    pub bounds: Option<Bounds>,
}

/// Fit `model` to `(x, y)`.
pub fn curve_fit(model: FitModel, x: &[f64], y: &[f64], opts: &FitOptions) -> AnalysisResult<FitResult> {
    check_data(x, y)?;

    let n_params = model.param_count();
    if n_params == 0 {
        return Err(AnalysisError::InputShape(format!(
            "{} has no parameters to fit",
            model.display_name()
        )));
    }
    if x.len() < n_params {
        return Err(AnalysisError::InputShape(format!(
            "{} has {n_params} parameters but only {} data points",
            model.display_name(),
            x.len()
        )));
    }

    let mut guess = match &opts.initial_guess {
        Some(g) => g.clone(),
        None => vec![1.0; n_params],
    };
    if guess.len() != n_params {
        return Err(AnalysisError::InputShape(format!(
            "initial guess for {} has {} values, expected {n_params}",
            model.display_name(),
            guess.len()
        )));
    }

    let bounds = resolve_bounds(opts, n_params)?;
    if let Some(b) = &bounds {
        if !b.contains(&guess) {
            tracing::debug!(?guess, "initial guess outside bounds, projecting");
            b.project(&mut guess);
        }
    }

    let outcome = minimize(
        model,
        x,
        y,
        &guess,
        bounds.as_ref(),
        LmConfig::for_params(n_params),
    )?;

    let m = x.len();
    let uncertainties = match covariance(&outcome.jacobian, outcome.sse, m - n_params) {
        Some(cov) => (0..n_params).map(|j| cov[(j, j)].max(0.0).sqrt()).collect(),
        None => {
            tracing::warn!(
                model = %model.display_name(),
                "covariance is singular; uncertainties set to NaN"
            );
            vec![f64::NAN; n_params]
        }
    };

    Ok(FitResult {
        model,
        params: outcome.params,
        uncertainties,
        quality: FitQuality {
            sse: outcome.sse,
            rmse: (outcome.sse / m as f64).sqrt(),
            n: m,
            iterations: outcome.iterations,
        },
    })
}

/// Fit several models to the same data independently (parallel).
///
/// Results come back in the order of `models`; one model failing does not
/// affect the others.
pub fn fit_models(
    models: &[FitModel],
    x: &[f64],
    y: &[f64],
    opts: &FitOptions,
) -> Vec<(FitModel, AnalysisResult<FitResult>)> {
    models
        .par_iter()
        .map(|&model| (model, curve_fit(model, x, y, opts)))
        .collect()
}

fn check_data(x: &[f64], y: &[f64]) -> AnalysisResult<()> {
    if x.len() != y.len() {
        return Err(AnalysisError::InputShape(format!(
            "x has {} samples, y has {}",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(AnalysisError::InputShape("no data points to fit".into()));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(AnalysisError::InputShape("fit data contains non-finite values".into()));
    }
    Ok(())
}

fn resolve_bounds(opts: &FitOptions, n_params: usize) -> AnalysisResult<Option<Bounds>> {
    let Some(bounds) = &opts.bounds else {
        return Ok(None);
    };
    if bounds.len() != n_params {
        return Err(AnalysisError::InputShape(format!(
            "bounds cover {} parameters, model has {n_params}",
            bounds.len()
        )));
    }
    // Re-check in case the struct was built by hand rather than via `Bounds::new`.
    let bounds = Bounds::new(bounds.lower.clone(), bounds.upper.clone())?;

    match opts.method {
        SolverMethod::LevenbergMarquardt if bounds.has_finite() => {
            Err(AnalysisError::InvalidParameter(
                "Levenberg–Marquardt does not accept bounds; use the bounded method".into(),
            ))
        }
        SolverMethod::LevenbergMarquardt => Ok(None),
        SolverMethod::Auto | SolverMethod::BoundedLevenbergMarquardt => {
            Ok(bounds.has_finite().then_some(bounds))
        }
    }
}
