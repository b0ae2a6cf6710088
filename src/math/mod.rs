//! Numerical utilities: least squares, quadrature, and small array statistics.

pub mod integrate;
pub mod ols;
pub mod stats;

pub use integrate::*;
pub use ols::*;
pub use stats::*;
