//! Shared domain types.
//!
//! Traces are read-only once built; everything else here is derived per request
//! and never persisted by the core.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::config::ChannelMap;
use crate::error::{AnalysisError, AnalysisResult};

/// One of the fixed channels recorded by the oscilloscope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Time,
    SignalTransmitted,
    SignalReference,
    ControlTransmitted,
    ControlReference,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Time,
        Channel::SignalTransmitted,
        Channel::SignalReference,
        Channel::ControlTransmitted,
        Channel::ControlReference,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Channel::Time => "time",
            Channel::SignalTransmitted => "signal transmitted",
            Channel::SignalReference => "signal reference",
            Channel::ControlTransmitted => "control transmitted",
            Channel::ControlReference => "control reference",
        }
    }
}

/// Half-open sample range `[start, end)` into a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWindow {
    pub start: usize,
    pub end: usize,
}

impl SampleWindow {
    pub fn new(start: usize, end: usize) -> AnalysisResult<Self> {
        if start >= end {
            return Err(AnalysisError::IntegrationDomain(format!(
                "empty sample window [{start}, {end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Check the window lies inside a trace of `len` samples.
    pub fn check_within(&self, len: usize) -> AnalysisResult<()> {
        if self.is_empty() || self.end > len {
            return Err(AnalysisError::IntegrationDomain(format!(
                "sample window [{}, {}) outside trace of {len} samples",
                self.start, self.end
            )));
        }
        Ok(())
    }
}

/// A multi-channel oscilloscope recording.
///
/// Invariants (checked on construction):
/// - all channels share the same, non-zero sample count
/// - time is strictly increasing
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    time: Vec<f64>,
    signal_transmitted: Vec<f64>,
    signal_reference: Vec<f64>,
    control_transmitted: Vec<f64>,
    control_reference: Vec<f64>,
}

impl Trace {
    pub fn new(
        time: Vec<f64>,
        signal_transmitted: Vec<f64>,
        signal_reference: Vec<f64>,
        control_transmitted: Vec<f64>,
        control_reference: Vec<f64>,
    ) -> AnalysisResult<Self> {
        let n = time.len();
        if n == 0 {
            return Err(AnalysisError::InputShape("trace has no samples".into()));
        }
        for (channel, len) in [
            (Channel::SignalTransmitted, signal_transmitted.len()),
            (Channel::SignalReference, signal_reference.len()),
            (Channel::ControlTransmitted, control_transmitted.len()),
            (Channel::ControlReference, control_reference.len()),
        ] {
            if len != n {
                return Err(AnalysisError::InputShape(format!(
                    "{} has {len} samples, time has {n}",
                    channel.display_name()
                )));
            }
        }
        if let Some(i) = time.windows(2).position(|w| !(w[1] > w[0])) {
            return Err(AnalysisError::InputShape(format!(
                "time is not strictly increasing at sample {}",
                i + 1
            )));
        }

        Ok(Self {
            time,
            signal_transmitted,
            signal_reference,
            control_transmitted,
            control_reference,
        })
    }

    /// Build a trace from raw file columns using a declared channel mapping.
    pub fn from_columns(columns: &[Vec<f64>], map: &ChannelMap) -> AnalysisResult<Self> {
        let column = |channel: Channel| -> AnalysisResult<Vec<f64>> {
            let idx = map.index(channel);
            columns.get(idx).cloned().ok_or_else(|| {
                AnalysisError::InputShape(format!(
                    "{} mapped to column {idx}, but the file has {} columns",
                    channel.display_name(),
                    columns.len()
                ))
            })
        };

        Self::new(
            column(Channel::Time)?,
            column(Channel::SignalTransmitted)?,
            column(Channel::SignalReference)?,
            column(Channel::ControlTransmitted)?,
            column(Channel::ControlReference)?,
        )
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn channel(&self, channel: Channel) -> &[f64] {
        match channel {
            Channel::Time => &self.time,
            Channel::SignalTransmitted => &self.signal_transmitted,
            Channel::SignalReference => &self.signal_reference,
            Channel::ControlTransmitted => &self.control_transmitted,
            Channel::ControlReference => &self.control_reference,
        }
    }

    /// Copy out a sub-range of every channel.
    pub fn slice(&self, window: SampleWindow) -> AnalysisResult<Trace> {
        window.check_within(self.len())?;
        let cut = |v: &[f64]| v[window.start..window.end].to_vec();
        Ok(Trace {
            time: cut(&self.time),
            signal_transmitted: cut(&self.signal_transmitted),
            signal_reference: cut(&self.signal_reference),
            control_transmitted: cut(&self.control_transmitted),
            control_reference: cut(&self.control_reference),
        })
    }
}

/// Which transitions a trigger search reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EdgeMode {
    /// Earliest rising edge only.
    Rising,
    /// Latest falling edge only.
    Falling,
    /// Every rising and falling edge, sorted.
    Both,
}

/// Sample indices where a thresholded mask changes state.
///
/// A rising index is the first sample at/above threshold; a falling index is
/// the first sample below it (which may equal the trace length when the signal
/// is still high at the end).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeSet {
    pub mode: EdgeMode,
    pub indices: Vec<usize>,
}

impl EdgeSet {
    pub fn first(&self) -> Option<usize> {
        self.indices.first().copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Centres of a two-pulse trigger and their time separation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PulseSpacing {
    pub centres: [usize; 2],
    /// `time[centres[1]] - time[centres[0]]`, when time data was supplied.
    pub tau: Option<f64>,
}

/// Closed-form physical models available to the fitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitModel {
    /// `y0·exp(−x/T1) + offset`
    ExpDecay,
    /// `y1·exp(−x/T1) + y2·exp(−x/T2) + offset`
    DoubleExpDecay,
    /// `amp·exp(−(x−x0)²/(2σ²)) + y0`
    Gaussian,
    /// Sum of `count` Gaussians, each `(amp, y0, x0, σ)`.
    MultiGaussian { count: usize },
    /// `amp·(½γ)²/((x−x0)²+(½γ)²) + y0`
    Lorentzian,
    /// `η·Gaussian + (1−η)·Lorentzian + y0`
    PseudoVoigt,
    /// `a·x + b`
    Linear,
    /// `amp·(1−exp(−(t−t0)/tr))`
    SaturatingRise,
}

impl FitModel {
    /// Parameters per Gaussian term in [`FitModel::MultiGaussian`].
    pub const GAUSSIAN_TERM_LEN: usize = 4;

    /// Derive a multi-Gaussian model from a flat parameter vector.
    pub fn multi_gaussian_for(param_len: usize) -> AnalysisResult<Self> {
        if param_len == 0 || param_len % Self::GAUSSIAN_TERM_LEN != 0 {
            return Err(AnalysisError::InputShape(format!(
                "multi-Gaussian parameters must be a non-zero multiple of {}, got {param_len}",
                Self::GAUSSIAN_TERM_LEN
            )));
        }
        Ok(FitModel::MultiGaussian {
            count: param_len / Self::GAUSSIAN_TERM_LEN,
        })
    }

    pub fn display_name(self) -> String {
        match self {
            FitModel::ExpDecay => "exponential decay".to_string(),
            FitModel::DoubleExpDecay => "double exponential decay".to_string(),
            FitModel::Gaussian => "Gaussian".to_string(),
            FitModel::MultiGaussian { count } => format!("sum of {count} Gaussians"),
            FitModel::Lorentzian => "Lorentzian".to_string(),
            FitModel::PseudoVoigt => "pseudo-Voigt (GLS)".to_string(),
            FitModel::Linear => "linear".to_string(),
            FitModel::SaturatingRise => "saturating rise".to_string(),
        }
    }

    pub fn param_count(self) -> usize {
        match self {
            FitModel::ExpDecay => 3,
            FitModel::DoubleExpDecay => 5,
            FitModel::Gaussian => 4,
            FitModel::MultiGaussian { count } => count * Self::GAUSSIAN_TERM_LEN,
            FitModel::Lorentzian => 4,
            FitModel::PseudoVoigt => 8,
            FitModel::Linear => 2,
            FitModel::SaturatingRise => 3,
        }
    }

    /// Parameter names, in vector order.
    pub fn param_names(self) -> Vec<String> {
        let fixed: &[&str] = match self {
            FitModel::ExpDecay => &["y0", "t1", "offset"],
            FitModel::DoubleExpDecay => &["y1", "y2", "t1", "t2", "offset"],
            FitModel::Gaussian => &["amp", "y0", "x0", "sigma"],
            FitModel::MultiGaussian { count } => {
                return (0..count)
                    .flat_map(|k| {
                        ["amp", "y0", "x0", "sigma"].map(|name| format!("{name}_{k}"))
                    })
                    .collect();
            }
            FitModel::Lorentzian => &["amp", "y0", "x0", "gamma"],
            FitModel::PseudoVoigt => {
                &["y0", "amp_g", "x0_g", "sigma", "amp_l", "x0_l", "gamma", "eta"]
            }
            FitModel::Linear => &["a", "b"],
            FitModel::SaturatingRise => &["amp", "t0", "tr"],
        };
        fixed.iter().map(|s| s.to_string()).collect()
    }
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct FitQuality {
    pub sse: f64,
    pub rmse: f64,
    pub n: usize,
    pub iterations: usize,
}

/// Fitted parameters with their one-sigma uncertainties.
///
/// `uncertainties` has the same length as `params`. Entries are non-negative,
/// or NaN when the covariance matrix is singular.
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub model: FitModel,
    pub params: Vec<f64>,
    pub uncertainties: Vec<f64>,
    pub quality: FitQuality,
}

impl FitResult {
    pub fn covariance_is_singular(&self) -> bool {
        self.uncertainties.iter().any(|u| u.is_nan())
    }

    /// Surface a singular covariance as an error for callers that need uncertainties.
    pub fn check_covariance(&self) -> AnalysisResult<()> {
        if self.covariance_is_singular() {
            return Err(AnalysisError::SingularCovariance {
                model: self.model.display_name(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn trace_rejects_mismatched_channels() {
        let err = Trace::new(ramp(4), ramp(4), ramp(3), ramp(4), ramp(4)).unwrap_err();
        assert!(matches!(err, AnalysisError::InputShape(_)));
    }

    #[test]
    fn trace_rejects_non_increasing_time() {
        let time = vec![0.0, 1.0, 1.0, 2.0];
        let err = Trace::new(time, ramp(4), ramp(4), ramp(4), ramp(4)).unwrap_err();
        assert!(matches!(err, AnalysisError::InputShape(_)));
    }

    #[test]
    fn slice_keeps_channels_aligned() {
        let trace = Trace::new(ramp(10), ramp(10), ramp(10), ramp(10), ramp(10)).unwrap();
        let cut = trace.slice(SampleWindow::new(2, 5).unwrap()).unwrap();
        assert_eq!(cut.len(), 3);
        assert_eq!(cut.time(), &[2.0, 3.0, 4.0]);
        assert_eq!(cut.channel(Channel::ControlReference), &[2.0, 3.0, 4.0]);

        let err = trace.slice(SampleWindow { start: 8, end: 11 }).unwrap_err();
        assert!(matches!(err, AnalysisError::IntegrationDomain(_)));
    }

    #[test]
    fn multi_gaussian_requires_multiple_of_four() {
        assert_eq!(
            FitModel::multi_gaussian_for(8).unwrap(),
            FitModel::MultiGaussian { count: 2 }
        );
        assert!(FitModel::multi_gaussian_for(6).is_err());
        assert!(FitModel::multi_gaussian_for(0).is_err());
    }

    #[test]
    fn param_names_match_counts() {
        for model in [
            FitModel::ExpDecay,
            FitModel::DoubleExpDecay,
            FitModel::Gaussian,
            FitModel::MultiGaussian { count: 3 },
            FitModel::Lorentzian,
            FitModel::PseudoVoigt,
            FitModel::Linear,
            FitModel::SaturatingRise,
        ] {
            assert_eq!(model.param_names().len(), model.param_count());
        }
    }
}
