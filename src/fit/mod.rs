//! Nonlinear least-squares fitting of the closed-form models.
//!
//! - `lm`: the Levenberg–Marquardt core (plain and box-projected)
//! - `fitter`: options, bounds, covariance and the public `curve_fit`

pub mod fitter;
mod lm;

pub use fitter::*;
