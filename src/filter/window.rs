//! Window shapes used for kernel design.
//!
//! Every window here has odd length: an even request is rounded up by one so
//! the window is symmetric about a single centre tap.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::models::gaussian;

/// Shape of a moving-average window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MovingAverageShape {
    /// Boxcar: every tap equal.
    #[default]
    Uniform,
    /// Gaussian centred on the middle tap with σ = (N − 1)/5.
    Gaussian,
    Blackman,
}

/// Round an even length up to the next odd one.
pub fn odd_length(n: usize) -> usize {
    if n % 2 == 0 { n + 1 } else { n }
}

/// Blackman window: `0.42 − 0.5·cos(2πn/(N−1)) + 0.08·cos(4πn/(N−1))`.
pub fn blackman(n: usize) -> Vec<f64> {
    let n = odd_length(n);
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| {
            let phase = std::f64::consts::PI * i as f64 / denom;
            0.42 - 0.5 * (2.0 * phase).cos() + 0.08 * (4.0 * phase).cos()
        })
        .collect()
}

/// Normalised sinc, `sin(πx)/(πx)` with `sinc(0) = 1`.
pub fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }
    let px = std::f64::consts::PI * x;
    px.sin() / px
}

/// Ideal low-pass impulse response `sinc(2·fc·(n − centre))`, unwindowed.
pub fn sinc_response(n: usize, cutoff: f64) -> Vec<f64> {
    let n = odd_length(n);
    let centre = ((n - 1) / 2) as f64;
    (0..n)
        .map(|i| sinc(2.0 * cutoff * (i as f64 - centre)))
        .collect()
}

/// Un-normalised moving-average window of the requested shape.
pub fn shape_window(n: usize, shape: MovingAverageShape) -> Vec<f64> {
    let n = odd_length(n);
    match shape {
        MovingAverageShape::Uniform => vec![1.0; n],
        MovingAverageShape::Blackman => blackman(n),
        MovingAverageShape::Gaussian => {
            if n == 1 {
                return vec![1.0];
            }
            let centre = ((n - 1) / 2) as f64;
            let sigma = (n - 1) as f64 / 5.0;
            (0..n)
                .map(|i| gaussian(i as f64, 1.0, 0.0, centre, sigma))
                .collect()
        }
    }
}
