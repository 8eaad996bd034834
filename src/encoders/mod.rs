//! Categorical encoders.
//!
//! One label encoder per categorical feature, loaded from the encoder bundle
//! artifact and frozen for the lifetime of the process.

pub mod registry;

pub use registry::*;
