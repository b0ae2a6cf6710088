//! FIR kernel design and signal conditioning.
//!
//! - window shapes and the windowed-sinc prototype (`window`)
//! - low/high/band-pass and moving-average kernels (`kernel`)
//! - delay-compensated convolution of a kernel with a trace (`condition`)

pub mod condition;
pub mod kernel;
pub mod window;

pub use condition::*;
pub use kernel::*;
pub use window::*;
