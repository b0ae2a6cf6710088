//! Edge and peak detection on sampled traces.

pub mod peaks;
pub mod trigger;

pub use peaks::*;
pub use trigger::*;
