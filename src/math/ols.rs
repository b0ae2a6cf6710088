//! Dense least-squares helpers built on SVD.
//!
//! Two problems come up repeatedly in the fitter:
//!
//! ```text
//! minimize ‖A δ − b‖²            (damped Gauss–Newton step)
//! cov = s² (JᵀJ)⁻¹               (parameter covariance at the optimum)
//! ```
//!
//! Both are solved through the SVD so that tall, rank-deficient systems are
//! detected instead of silently producing garbage.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(a: &DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = a.clone().svd(true, true);

    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(x) = svd.solve(b, tol) {
            if x.iter().all(|v| v.is_finite()) {
                return Some(x);
            }
        }
    }

    None
}

/// Scaled covariance `s² (JᵀJ)⁻¹` with `s² = sse / dof`.
///
/// Returns `None` when `J` is rank-deficient (any singular value below
/// `ε · max(m, n) · σ_max`) or when there are no residual degrees of freedom.
pub fn covariance(jacobian: &DMatrix<f64>, sse: f64, dof: usize) -> Option<DMatrix<f64>> {
    let (m, n) = jacobian.shape();
    if n == 0 || m < n || dof == 0 || !sse.is_finite() {
        return None;
    }
    if jacobian.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let svd = jacobian.clone().svd(false, true);
    let v_t = svd.v_t?;
    let s = &svd.singular_values;

    let s_max = s.iter().copied().fold(0.0_f64, f64::max);
    let threshold = f64::EPSILON * m.max(n) as f64 * s_max;
    if s_max <= 0.0 || s.iter().any(|&sv| sv <= threshold) {
        return None;
    }

    let s_sq = sse / dof as f64;
    let mut cov = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            let mut acc = 0.0;
            for k in 0..s.len() {
                acc += v_t[(k, i)] * v_t[(k, j)] / (s[k] * s[k]);
            }
            cov[(i, j)] = acc * s_sq;
        }
    }

    Some(cov)
}
