//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the categorical feature names shared with the encoder bundle (`Feature`)
//! - the validated input record (`VehicleSpec`)
//! - the ordered model input (`FeatureVector`)
//! - inference outputs (`PredictionResult`, `EmissionTier`)

pub mod types;

pub use types::*;
