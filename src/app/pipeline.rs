//! Shared pipelines behind the `areas` and `fit` subcommands.
//!
//! Keeping the workflows here leaves `app` with presentation only:
//! - areas: config -> per-state traces (parallel) -> corrected areas -> ratios
//! - fit: scope file -> windowed (x, y) -> one solve per model (parallel)

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Utc;
use rayon::prelude::*;

use crate::area::{AreaWindows, corrected_pulse_area, normalise, normalise_pulse_area};
use crate::domain::{ExperimentConfig, FitModel, FitResult, StateSpec};
use crate::error::AnalysisResult;
use crate::fit::{FitOptions, fit_models};
use crate::io::{AreaReport, load_trace, load_xy};
use crate::math::{Quadrature, window_indices};

/// Area and ratio for one state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateAreas {
    pub key: String,
    /// Leakage-corrected, reference-normalised pulse area.
    pub corrected: f64,
    /// Normalised pulse area of the state's reference trace.
    pub reference: f64,
    /// `corrected / reference`.
    pub ratio: f64,
}

fn state_areas(
    config: &ExperimentConfig,
    state: &StateSpec,
    windows: AreaWindows,
    rule: Quadrature,
) -> AnalysisResult<StateAreas> {
    let signal = load_trace(&state.signal, &config.channels)?;
    let leakage = load_trace(&state.leakage, &config.channels)?;
    let reference_trace = load_trace(&state.reference, &config.channels)?;

    let corrected = corrected_pulse_area(&signal, &leakage, config.area_channels, windows, rule)?;
    let reference = normalise_pulse_area(&reference_trace, config.area_channels, windows, rule)?;
    let ratio = normalise(corrected, reference, 0.0)?;

    tracing::info!(key = %state.key, corrected, reference, ratio, "state processed");
    Ok(StateAreas {
        key: state.key.clone(),
        corrected,
        reference,
        ratio,
    })
}

/// Compute every state's areas; states are independent and run in parallel.
///
/// The first failing state aborts the run.
pub fn run_areas(config: &ExperimentConfig, rule: Quadrature) -> AnalysisResult<Vec<StateAreas>> {
    let windows = match &config.trim {
        Some(trim) => AreaWindows::from_trim(trim)?,
        None => AreaWindows::full(),
    };

    config
        .states
        .par_iter()
        .map(|state| state_areas(config, state, windows, rule))
        .collect()
}

/// Collect per-state results into the exported key -> value maps.
pub fn area_report(states: &[StateAreas]) -> AreaReport {
    let mut area = BTreeMap::new();
    let mut ratio = BTreeMap::new();
    for s in states {
        area.insert(s.key.clone(), s.corrected);
        ratio.insert(s.key.clone(), s.ratio);
    }
    AreaReport {
        generated: Utc::now(),
        area,
        ratio,
    }
}

/// Everything needed for one `tpa fit` run.
#[derive(Debug, Clone)]
pub struct FitJob {
    pub input: PathBuf,
    pub x_col: usize,
    pub y_col: usize,
    pub models: Vec<FitModel>,
    pub options: FitOptions,
    /// Inclusive x-range, resolved to the nearest samples.
    pub window: Option<(f64, f64)>,
}

/// All computed outputs of a single fit run.
#[derive(Debug)]
pub struct FitRun {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub fits: Vec<(FitModel, AnalysisResult<FitResult>)>,
}

impl FitRun {
    pub fn best(&self) -> Option<&FitResult> {
        crate::report::best_fit(self.fits.iter().filter_map(|(_, r)| r.as_ref().ok()))
    }
}

pub fn run_fit(job: &FitJob) -> AnalysisResult<FitRun> {
    let (mut x, mut y) = load_xy(&job.input, job.x_col, job.y_col)?;

    if let Some(bounds) = job.window {
        let (lo, hi) = window_indices(&x, bounds)?;
        x = x[lo..=hi].to_vec();
        y = y[lo..=hi].to_vec();
        tracing::debug!(lo, hi, "fit window");
    }

    let fits = fit_models(&job.models, &x, &y, &job.options);
    Ok(FitRun { x, y, fits })
}
