//! `tpa-analysis` library crate.
//!
//! Signal conditioning, trigger/peak detection, model fitting and pulse-area
//! ratios for two-photon-absorption pump-probe oscilloscope traces.
//!
//! The binary (`tpa`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the analysis modules stay free of file and terminal I/O

pub mod app;
pub mod area;
pub mod cli;
pub mod detect;
pub mod domain;
pub mod error;
pub mod filter;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
