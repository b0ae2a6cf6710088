//! Domain types used throughout the analysis.
//!
//! This module defines:
//!
//! - the multi-channel oscilloscope [`Trace`] and its named [`Channel`]s
//! - derived per-request values (`EdgeSet`, `SampleWindow`, `FitResult`)
//! - the model catalogue (`FitModel`)
//! - typed experiment configuration (`ExperimentConfig` and friends)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
