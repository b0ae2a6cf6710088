//! Crate-wide error type.
//!
//! Every failure the analysis core can produce is a distinct variant so callers
//! can match on the kind instead of parsing messages. The binary maps each kind
//! to a process exit code via [`AnalysisError::exit_code`].

use std::path::PathBuf;

use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Mismatched channel/sample counts or malformed composite-model parameters.
    #[error("Input shape error: {0}")]
    InputShape(String),

    /// A scalar argument outside its admissible range (cutoff, modifier, bounds method, ...).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No sample reached the trigger threshold.
    #[error("No sample reaches the trigger threshold {threshold} (max {max})")]
    ThresholdMiss { threshold: f64, max: f64 },

    /// Pulse-pair spacing only supports exactly two pulses.
    #[error("Pulse spacing requires exactly 2 pulses, found {found}")]
    UnsupportedPulseCount { found: usize },

    /// The solver did not converge, or the bounds admit no solution.
    #[error("Fit did not converge: {0}")]
    FitConvergence(String),

    /// Covariance of the fitted parameters could not be estimated.
    #[error("Singular covariance for {model}: parameter uncertainties are undefined")]
    SingularCovariance { model: String },

    /// Integration window or column outside the trace.
    #[error("Integration domain error: {0}")]
    IntegrationDomain(String),

    /// Averaging was requested but no input array was finite.
    #[error("Cannot average: none of the {count} arrays is finite")]
    EmptyAverage { count: usize },

    /// Invalid experiment configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AnalysisError {
    /// Process exit code for the `tpa` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            AnalysisError::InputShape(_)
            | AnalysisError::InvalidParameter(_)
            | AnalysisError::Config(_) => 2,
            AnalysisError::ThresholdMiss { .. } | AnalysisError::UnsupportedPulseCount { .. } => 3,
            AnalysisError::FitConvergence(_)
            | AnalysisError::SingularCovariance { .. }
            | AnalysisError::IntegrationDomain(_)
            | AnalysisError::EmptyAverage { .. } => 4,
            AnalysisError::Io { .. } => 5,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_group_by_kind() {
        assert_eq!(AnalysisError::InputShape("x".into()).exit_code(), 2);
        assert_eq!(
            AnalysisError::ThresholdMiss {
                threshold: 1.0,
                max: 0.5
            }
            .exit_code(),
            3
        );
        assert_eq!(AnalysisError::FitConvergence("x".into()).exit_code(), 4);
        assert_eq!(
            AnalysisError::io("a.csv", std::io::Error::other("boom")).exit_code(),
            5
        );
    }
}
