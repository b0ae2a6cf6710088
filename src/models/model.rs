//! Model evaluation for every [`FitModel`].
//!
//! The fitter relies on one primitive: `y(x)` for a parameter vector. Scalar
//! forms are exposed individually so they can also be used for synthesis (the
//! Gaussian moving-average window is built from [`gaussian`]).
//!
//! Numerical notes:
//! - The saturating rise `1 − exp(−u)` is evaluated as `−expm1(−u)` to avoid
//!   cancellation close to `t0`.

use crate::domain::FitModel;
use crate::error::{AnalysisError, AnalysisResult};

pub fn exp_decay(x: f64, y0: f64, t1: f64, offset: f64) -> f64 {
    y0 * (-x / t1).exp() + offset
}

pub fn double_exp_decay(x: f64, y1: f64, y2: f64, t1: f64, t2: f64, offset: f64) -> f64 {
    y1 * (-x / t1).exp() + y2 * (-x / t2).exp() + offset
}

pub fn gaussian(x: f64, amp: f64, y0: f64, x0: f64, sigma: f64) -> f64 {
    let d = x - x0;
    amp * (-(d * d) / (2.0 * sigma * sigma)).exp() + y0
}

pub fn lorentzian(x: f64, amp: f64, y0: f64, x0: f64, gamma: f64) -> f64 {
    amp * lorentz_shape(x, x0, gamma) + y0
}

/// Unit-height Lorentzian with full width `gamma` at half maximum.
fn lorentz_shape(x: f64, x0: f64, gamma: f64) -> f64 {
    let hw = 0.5 * gamma;
    let d = x - x0;
    hw * hw / (d * d + hw * hw)
}

/// Pseudo-Voigt profile (GLS): `η·G + (1−η)·L + y0`.
///
/// The Gaussian and Lorentzian components carry independent amplitudes and
/// centres; only the offset is shared.
#[allow(clippy::too_many_arguments)]
pub fn pseudo_voigt(
    x: f64,
    y0: f64,
    amp_g: f64,
    x0_g: f64,
    sigma: f64,
    amp_l: f64,
    x0_l: f64,
    gamma: f64,
    eta: f64,
) -> f64 {
    let d = x - x0_g;
    let g = amp_g * (-(d * d) / (2.0 * sigma * sigma)).exp();
    let l = amp_l * lorentz_shape(x, x0_l, gamma);
    eta * g + (1.0 - eta) * l + y0
}

pub fn linear(x: f64, a: f64, b: f64) -> f64 {
    a * x + b
}

pub fn saturating_rise(t: f64, amp: f64, t0: f64, tr: f64) -> f64 {
    -amp * (-(t - t0) / tr).exp_m1()
}

/// Sum of Gaussians; `params` holds consecutive `(amp, y0, x0, σ)` groups.
pub fn n_gaussian(x: &[f64], params: &[f64]) -> AnalysisResult<Vec<f64>> {
    let model = FitModel::multi_gaussian_for(params.len())?;
    Ok(x.iter().map(|&xi| predict(model, xi, params)).collect())
}

/// Evaluate `model` at a single point.
///
/// # Panics
/// Panics if `params` is shorter than `model.param_count()`. Use [`evaluate`]
/// for a checked, vectorized call.
pub fn predict(model: FitModel, x: f64, p: &[f64]) -> f64 {
    match model {
        FitModel::ExpDecay => exp_decay(x, p[0], p[1], p[2]),
        FitModel::DoubleExpDecay => double_exp_decay(x, p[0], p[1], p[2], p[3], p[4]),
        FitModel::Gaussian => gaussian(x, p[0], p[1], p[2], p[3]),
        FitModel::MultiGaussian { count } => p
            .chunks_exact(FitModel::GAUSSIAN_TERM_LEN)
            .take(count)
            .map(|g| gaussian(x, g[0], g[1], g[2], g[3]))
            .sum(),
        FitModel::Lorentzian => lorentzian(x, p[0], p[1], p[2], p[3]),
        FitModel::PseudoVoigt => pseudo_voigt(x, p[0], p[1], p[2], p[3], p[4], p[5], p[6], p[7]),
        FitModel::Linear => linear(x, p[0], p[1]),
        FitModel::SaturatingRise => saturating_rise(x, p[0], p[1], p[2]),
    }
}

/// Check a parameter vector against the model's declared arity.
pub fn check_params(model: FitModel, params: &[f64]) -> AnalysisResult<()> {
    if let FitModel::MultiGaussian { count } = model {
        if count == 0 {
            return Err(AnalysisError::InputShape(
                "multi-Gaussian model needs at least one term".into(),
            ));
        }
    }
    if params.len() != model.param_count() {
        return Err(AnalysisError::InputShape(format!(
            "{} takes {} parameters, got {}",
            model.display_name(),
            model.param_count(),
            params.len()
        )));
    }
    Ok(())
}

/// Evaluate `model` over every `x`.
pub fn evaluate(model: FitModel, x: &[f64], params: &[f64]) -> AnalysisResult<Vec<f64>> {
    check_params(model, params)?;
    Ok(x.iter().map(|&xi| predict(model, xi, params)).collect())
}

/// Evaluate into a caller-owned buffer (no allocation in solver loops).
pub(crate) fn evaluate_into(model: FitModel, x: &[f64], params: &[f64], out: &mut [f64]) {
    for (o, &xi) in out.iter_mut().zip(x) {
        *o = predict(model, xi, params);
    }
}
