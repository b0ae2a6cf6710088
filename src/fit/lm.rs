//! Levenberg–Marquardt least squares, with an optional projected box.
//!
//! Each iteration solves the damped normal equations
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr
//! ```
//!
//! and accepts the step only if it lowers the sum of squared residuals.
//! Accepted steps shrink λ, rejected ones grow it. With a box, every trial
//! point is projected onto `[lower, upper]` and the gradient test ignores
//! components that push into an active bound.
//!
//! The Jacobian is taken by central differences, falling back to one-sided
//! differences next to a bound.

use nalgebra::{DMatrix, DVector};

use super::fitter::Bounds;
use crate::domain::FitModel;
use crate::error::{AnalysisError, AnalysisResult};
use crate::math::solve_least_squares;
use crate::models::evaluate_into;

#[derive(Debug, Clone, Copy)]
pub(crate) struct LmConfig {
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    pub max_iterations: usize,
}

impl LmConfig {
    pub(crate) fn for_params(n: usize) -> Self {
        Self {
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            max_iterations: 200 * (n + 1),
        }
    }
}

const LAMBDA_INIT: f64 = 1e-3;
const LAMBDA_MIN: f64 = 1e-12;
const LAMBDA_MAX: f64 = 1e16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StopReason {
    Gradient,
    CostReduction,
    StepSize,
    /// λ grew past its ceiling: no nearby point improves the fit.
    Stalled,
}

#[derive(Debug, Clone)]
pub(crate) struct LmOutcome {
    pub params: Vec<f64>,
    pub jacobian: DMatrix<f64>,
    pub sse: f64,
    pub iterations: usize,
    pub reason: StopReason,
}

struct Problem<'a> {
    model: FitModel,
    x: &'a [f64],
    y: &'a [f64],
    bounds: Option<&'a Bounds>,
}

impl Problem<'_> {
    fn residuals(&self, p: &[f64], out: &mut [f64]) -> f64 {
        evaluate_into(self.model, self.x, p, out);
        let mut sse = 0.0;
        for (r, &yi) in out.iter_mut().zip(self.y) {
            *r -= yi;
            sse += *r * *r;
        }
        sse
    }

    fn jacobian(&self, p: &[f64]) -> DMatrix<f64> {
        let m = self.x.len();
        let n = p.len();
        let mut jac = DMatrix::<f64>::zeros(m, n);
        let mut hi = vec![0.0; m];
        let mut lo = vec![0.0; m];
        let mut probe = p.to_vec();
        let base_step = f64::EPSILON.cbrt();

        for j in 0..n {
            let h = base_step * p[j].abs().max(1.0);
            let (lower, upper) = match self.bounds {
                Some(b) => (b.lower[j], b.upper[j]),
                None => (f64::NEG_INFINITY, f64::INFINITY),
            };
            let up = if p[j] + h <= upper { p[j] + h } else { p[j] };
            let down = if p[j] - h >= lower { p[j] - h } else { p[j] };
            let span = up - down;
            if span <= 0.0 {
                continue;
            }

            probe[j] = up;
            evaluate_into(self.model, self.x, &probe, &mut hi);
            probe[j] = down;
            evaluate_into(self.model, self.x, &probe, &mut lo);
            probe[j] = p[j];

            for i in 0..m {
                jac[(i, j)] = (hi[i] - lo[i]) / span;
            }
        }
        jac
    }

    fn project(&self, p: &mut [f64]) {
        if let Some(b) = self.bounds {
            b.project(p);
        }
    }

    /// Scale-free gradient test: the cosine between `r` and each Jacobian
    /// column, skipping components blocked by an active bound.
    fn gradient_converged(&self, p: &[f64], jac: &DMatrix<f64>, r: &[f64], gtol: f64) -> bool {
        let r_norm = r.iter().map(|v| v * v).sum::<f64>().sqrt();
        if r_norm == 0.0 {
            return true;
        }
        let r_vec = DVector::from_column_slice(r);
        let grad = jac.transpose() * &r_vec;
        (0..p.len()).all(|j| {
            if let Some(b) = self.bounds {
                // descent direction is −grad
                if (p[j] <= b.lower[j] && grad[j] > 0.0) || (p[j] >= b.upper[j] && grad[j] < 0.0) {
                    return true;
                }
            }
            let col_norm = jac.column(j).norm();
            col_norm == 0.0 || grad[j].abs() / (col_norm * r_norm) <= gtol
        })
    }
}

/// Minimise `Σ (model(x; p) − y)²` starting from `p0`.
pub(crate) fn minimize(
    model: FitModel,
    x: &[f64],
    y: &[f64],
    p0: &[f64],
    bounds: Option<&Bounds>,
    config: LmConfig,
) -> AnalysisResult<LmOutcome> {
    let problem = Problem { model, x, y, bounds };
    let m = x.len();
    let n = p0.len();

    let mut p = p0.to_vec();
    problem.project(&mut p);

    let mut r = vec![0.0; m];
    let mut sse = problem.residuals(&p, &mut r);
    if !sse.is_finite() {
        return Err(AnalysisError::FitConvergence(format!(
            "{} is not finite at the initial guess {p:?}",
            model.display_name()
        )));
    }

    let mut trial = vec![0.0; n];
    let mut r_trial = vec![0.0; m];
    let mut lambda = LAMBDA_INIT;
    let mut jac = problem.jacobian(&p);
    let mut iterations = 0;

    let reason = loop {
        if problem.gradient_converged(&p, &jac, &r, config.gtol) {
            break StopReason::Gradient;
        }
        if iterations >= config.max_iterations {
            return Err(AnalysisError::FitConvergence(format!(
                "{} did not converge in {} iterations (sse {sse:.6e})",
                model.display_name(),
                config.max_iterations
            )));
        }
        iterations += 1;

        let jt = jac.transpose();
        let jtj = &jt * &jac;
        let neg_grad = -(&jt * DVector::from_column_slice(&r));

        let mut damped = jtj.clone();
        for j in 0..n {
            let d = jtj[(j, j)].max(f64::MIN_POSITIVE);
            damped[(j, j)] += lambda * d;
        }

        let step = solve_least_squares(&damped, &neg_grad);
        let accepted = match step {
            Some(delta) => {
                for j in 0..n {
                    trial[j] = p[j] + delta[j];
                }
                problem.project(&mut trial);
                let sse_trial = problem.residuals(&trial, &mut r_trial);
                if sse_trial.is_finite() && sse_trial < sse {
                    let step_norm = trial
                        .iter()
                        .zip(&p)
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f64>()
                        .sqrt();
                    let p_norm = p.iter().map(|v| v * v).sum::<f64>().sqrt();
                    let reduction = sse - sse_trial;

                    std::mem::swap(&mut p, &mut trial);
                    std::mem::swap(&mut r, &mut r_trial);
                    sse = sse_trial;
                    jac = problem.jacobian(&p);

                    if reduction <= config.ftol * (sse + reduction) {
                        break StopReason::CostReduction;
                    }
                    if step_norm <= config.xtol * (config.xtol + p_norm) {
                        break StopReason::StepSize;
                    }
                    true
                } else {
                    false
                }
            }
            None => false,
        };

        if accepted {
            lambda = (lambda / 10.0).max(LAMBDA_MIN);
        } else {
            lambda *= 10.0;
            if lambda > LAMBDA_MAX {
                break StopReason::Stalled;
            }
        }
    };

    tracing::debug!(
        model = %model.display_name(),
        iterations,
        sse,
        ?reason,
        "least-squares solve finished"
    );

    Ok(LmOutcome {
        params: p,
        jacobian: jac,
        sse,
        iterations,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluate;

    #[test]
    fn recovers_line_exactly() {
        let x: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        let y = evaluate(FitModel::Linear, &x, &[1.5, -2.0]).unwrap();
        let out = minimize(FitModel::Linear, &x, &y, &[0.0, 0.0], None, LmConfig::for_params(2)).unwrap();
        assert!((out.params[0] - 1.5).abs() < 1e-8);
        assert!((out.params[1] + 2.0).abs() < 1e-8);
        assert!(out.sse < 1e-12);
    }

    #[test]
    fn projected_solve_stays_in_box() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y = evaluate(FitModel::Linear, &x, &[2.0, 1.0]).unwrap();
        let bounds = Bounds::new(vec![0.0, 0.0], vec![1.0, 10.0]).unwrap();
        let out = minimize(
            FitModel::Linear,
            &x,
            &y,
            &[0.5, 0.5],
            Some(&bounds),
            LmConfig::for_params(2),
        )
        .unwrap();
        assert!(out.params[0] <= 1.0);
        assert!((out.params[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn non_finite_start_is_a_convergence_error() {
        let x = [0.0, 1.0, 2.0];
        let y = [1.0, 0.5, 0.25];
        let err = minimize(
            FitModel::ExpDecay,
            &x,
            &y,
            &[1.0, 0.0, 0.0],
            None,
            LmConfig::for_params(3),
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::FitConvergence(_)));
    }

    #[test]
    fn iteration_cap_is_a_convergence_error() {
        let x: Vec<f64> = (0..30).map(|i| i as f64 * 0.1).collect();
        let y = evaluate(FitModel::ExpDecay, &x, &[3.0, 0.7, 0.2]).unwrap();
        let config = LmConfig {
            ftol: 0.0,
            xtol: 0.0,
            gtol: 0.0,
            max_iterations: 1,
        };
        let err = minimize(FitModel::ExpDecay, &x, &y, &[1.0, 1.0, 0.0], None, config).unwrap_err();
        match err {
            AnalysisError::FitConvergence(msg) => assert!(msg.contains("1 iterations"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
