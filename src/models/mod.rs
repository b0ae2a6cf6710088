//! Closed-form physical models.
//!
//! Models are implemented as small, pure functions so that fitting code can
//! stay generic over [`FitModel`](crate::domain::FitModel).

pub mod model;

pub use model::*;
