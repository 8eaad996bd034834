//! Regression model artifacts.
//!
//! Models are plain data loaded from JSON plus small, pure evaluation functions,
//! so the pipeline only depends on the [`Regressor`] trait.

pub mod model;

pub use model::*;
