//! Command-line parsing for the `tpa` pump-probe analyser.
//!
//! Argument parsing and command dispatch stay separate from the signal and
//! fitting code; every subcommand maps onto one library operation.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::{EdgeMode, FitModel};
use crate::filter::MovingAverageShape;
use crate::fit::SolverMethod;
use crate::math::Quadrature;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tpa", version, about = "Two-photon absorption pump-probe trace analysis")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compute corrected pulse-area ratios for every state in an experiment config.
    Areas(AreasArgs),
    /// Fit one or more models to a pair of columns from a scope file.
    Fit(FitArgs),
    /// Locate trigger edges (or the spacing of a two-pulse trigger).
    Trigger(TriggerArgs),
    /// Smooth or band-limit a column and write the conditioned trace.
    Smooth(SmoothArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct AreasArgs {
    /// Experiment configuration (JSON).
    #[arg(long, value_name = "JSON")]
    pub config: PathBuf,

    /// Quadrature rule for pulse areas.
    #[arg(long, value_enum, default_value_t = Quadrature::Simpson)]
    pub rule: Quadrature,

    /// Write `{generated, area, ratio}` JSON here.
    #[arg(long, value_name = "JSON")]
    pub output: Option<PathBuf>,
}

/// Model selector; `n-gaussian` takes its term count from `--terms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModelArg {
    ExpDecay,
    DoubleExpDecay,
    Gaussian,
    NGaussian,
    Lorentzian,
    PseudoVoigt,
    Linear,
    RiseTime,
}

impl ModelArg {
    pub fn to_model(self, terms: usize) -> FitModel {
        match self {
            ModelArg::ExpDecay => FitModel::ExpDecay,
            ModelArg::DoubleExpDecay => FitModel::DoubleExpDecay,
            ModelArg::Gaussian => FitModel::Gaussian,
            ModelArg::NGaussian => FitModel::MultiGaussian { count: terms },
            ModelArg::Lorentzian => FitModel::Lorentzian,
            ModelArg::PseudoVoigt => FitModel::PseudoVoigt,
            ModelArg::Linear => FitModel::Linear,
            ModelArg::RiseTime => FitModel::SaturatingRise,
        }
    }
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    /// Scope export to read.
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Column holding the independent variable.
    #[arg(long, default_value_t = 0)]
    pub x_col: usize,

    /// Column holding the dependent variable.
    #[arg(long, default_value_t = 1)]
    pub y_col: usize,

    /// Model(s) to fit; repeat or comma-separate for several.
    #[arg(long, value_enum, value_delimiter = ',', default_value = "exp-decay")]
    pub model: Vec<ModelArg>,

    /// Gaussian terms for `n-gaussian`.
    #[arg(long, default_value_t = 2)]
    pub terms: usize,

    /// Initial guess, comma-separated (all ones when omitted).
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub guess: Option<Vec<f64>>,

    /// Lower bounds, comma-separated.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub lower: Option<Vec<f64>>,

    /// Upper bounds, comma-separated.
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
    pub upper: Option<Vec<f64>>,

    /// Solver variant.
    #[arg(long, value_enum, default_value_t = SolverMethod::Auto)]
    pub method: SolverMethod,

    /// Restrict the fit to x in [MIN, MAX] (nearest samples).
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"], allow_negative_numbers = true)]
    pub window: Option<Vec<f64>>,

    /// Export the best fit (parameters + fitted grid) to JSON.
    #[arg(long, value_name = "JSON")]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct TriggerArgs {
    /// Scope export to read.
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Column holding time.
    #[arg(long, default_value_t = 0)]
    pub time_col: usize,

    /// Column holding the trigger signal.
    #[arg(long, default_value_t = 1)]
    pub col: usize,

    /// Threshold as a fraction of the signal maximum.
    #[arg(long, default_value_t = crate::detect::DEFAULT_MODIFIER)]
    pub modifier: f64,

    /// Which edges to report.
    #[arg(long, value_enum, default_value_t = EdgeMode::Rising)]
    pub edge: EdgeMode,

    /// Report the centres and separation of a two-pulse trigger instead.
    #[arg(long)]
    pub tau: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FilterArg {
    MovingAverage,
    LowPass,
    HighPass,
    BandPass,
}

#[derive(Debug, Parser, Clone)]
pub struct SmoothArgs {
    /// Scope export to read.
    #[arg(long, value_name = "FILE")]
    pub input: PathBuf,

    /// Column holding time.
    #[arg(long, default_value_t = 0)]
    pub time_col: usize,

    /// Column to condition.
    #[arg(long, default_value_t = 1)]
    pub col: usize,

    #[arg(long, value_enum, default_value_t = FilterArg::MovingAverage)]
    pub filter: FilterArg,

    /// Kernel length (even lengths are rounded up).
    #[arg(long, default_value_t = 11)]
    pub taps: usize,

    /// Moving-average window shape.
    #[arg(long, value_enum, default_value_t = MovingAverageShape::Uniform)]
    pub shape: MovingAverageShape,

    /// Normalised cutoff for low/high-pass, upper edge for band-pass.
    #[arg(long, default_value_t = 0.1)]
    pub cutoff: f64,

    /// Lower band edge for band-pass.
    #[arg(long, default_value_t = 0.01)]
    pub low_cutoff: f64,

    /// Conditioned output (CSV: time, raw, filtered).
    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,
}
