//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the log subscriber
//! - parses CLI arguments
//! - runs the requested pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{AreasArgs, Command, FilterArg, FitArgs, SmoothArgs, TriggerArgs};
use crate::detect::{find_tau, find_trigger};
use crate::error::{AnalysisError, AnalysisResult};
use crate::filter::{FilterKernel, band_pass, condition, high_pass, low_pass, moving_average};
use crate::fit::{Bounds, FitOptions};
use crate::io::{FitFile, load_config, load_xy, write_area_json, write_columns_csv, write_fit_json};
use crate::report::{compute_residuals, format_area_summary, format_edges, format_fit_summary, format_spacing};

pub mod pipeline;

/// Entry point for the `tpa` binary.
pub fn run() -> AnalysisResult<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Areas(args) => handle_areas(args),
        Command::Fit(args) => handle_fit(args),
        Command::Trigger(args) => handle_trigger(args),
        Command::Smooth(args) => handle_smooth(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Only fails if a subscriber is already installed.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_areas(args: AreasArgs) -> AnalysisResult<()> {
    let config = load_config(&args.config)?;
    tracing::info!(states = config.states.len(), rule = ?args.rule, "running pulse-area analysis");

    let states = pipeline::run_areas(&config, args.rule)?;
    let report = pipeline::area_report(&states);
    println!("{}", format_area_summary(&report));

    if let Some(path) = &args.output {
        write_area_json(path, &report)?;
        tracing::info!(path = %path.display(), "wrote area report");
    }
    Ok(())
}

fn handle_fit(args: FitArgs) -> AnalysisResult<()> {
    let job = fit_job_from_args(&args)?;
    let run = pipeline::run_fit(&job)?;

    println!(
        "{}",
        format_fit_summary(&args.input.display().to_string(), run.x.len(), &run.fits)
    );

    if run.best().is_none() {
        // Every model failed: surface the first error.
        return match run.fits.into_iter().next() {
            Some((_, Err(e))) => Err(e),
            _ => Err(AnalysisError::FitConvergence("no model produced a fit".into())),
        };
    }

    if let (Some(path), Some(best)) = (&args.export, run.best()) {
        let x_min = run.x.iter().copied().fold(f64::INFINITY, f64::min);
        let x_max = run.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let residuals = compute_residuals(&run.x, &run.y, best)?;
        let file = FitFile::new(best, x_min, x_max, 201)?.with_residuals(run.x.clone(), residuals)?;
        write_fit_json(path, &file)?;
        tracing::info!(path = %path.display(), "wrote fit export");
    }
    Ok(())
}

pub fn fit_job_from_args(args: &FitArgs) -> AnalysisResult<pipeline::FitJob> {
    let bounds = match (&args.lower, &args.upper) {
        (None, None) => None,
        (Some(lo), Some(hi)) => Some(Bounds::new(lo.clone(), hi.clone())?),
        (Some(lo), None) => Some(Bounds::new(lo.clone(), vec![f64::INFINITY; lo.len()])?),
        (None, Some(hi)) => Some(Bounds::new(vec![f64::NEG_INFINITY; hi.len()], hi.clone())?),
    };
    let window = match args.window.as_deref() {
        None => None,
        Some(&[a, b]) => Some((a, b)),
        Some(other) => {
            return Err(AnalysisError::InvalidParameter(format!(
                "fit window needs two values, got {}",
                other.len()
            )));
        }
    };

    Ok(pipeline::FitJob {
        input: args.input.clone(),
        x_col: args.x_col,
        y_col: args.y_col,
        models: args.model.iter().map(|m| m.to_model(args.terms)).collect(),
        options: FitOptions {
            initial_guess: args.guess.clone(),
            method: args.method,
            bounds,
        },
        window,
    })
}

fn handle_trigger(args: TriggerArgs) -> AnalysisResult<()> {
    let (time, signal) = load_xy(&args.input, args.time_col, args.col)?;

    if args.tau {
        let spacing = find_tau(&signal, Some(&time), args.modifier)?;
        print!("{}", format_spacing(&spacing));
    } else {
        let edges = find_trigger(&signal, args.modifier, args.edge)?;
        print!("{}", format_edges(&edges, Some(&time)));
    }
    Ok(())
}

fn kernel_from_args(args: &SmoothArgs) -> AnalysisResult<FilterKernel> {
    match args.filter {
        FilterArg::MovingAverage => moving_average(args.taps, args.shape),
        FilterArg::LowPass => low_pass(args.taps, args.cutoff),
        FilterArg::HighPass => high_pass(args.taps, args.cutoff),
        FilterArg::BandPass => band_pass(args.taps, args.cutoff, args.taps, args.low_cutoff),
    }
}

fn handle_smooth(args: SmoothArgs) -> AnalysisResult<()> {
    let (time, raw) = load_xy(&args.input, args.time_col, args.col)?;
    let kernel = kernel_from_args(&args)?;
    let filtered = condition(&kernel, &raw);
    tracing::info!(kind = ?kernel.kind(), taps = kernel.len(), samples = raw.len(), "conditioned trace");

    write_columns_csv(&args.output, &["time", "raw", "filtered"], &[time.as_slice(), raw.as_slice(), filtered.as_slice()])?;
    Ok(())
}
