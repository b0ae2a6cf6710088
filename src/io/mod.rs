//! Input/output collaborators around the analysis core.
//!
//! - scope-file and config ingest (`ingest`)
//! - JSON/CSV result exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
