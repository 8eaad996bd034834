//! Input/output helpers.
//!
//! - model + encoder artifact loading (`artifacts`)
//! - CSV batch scoring (`batch`)

pub mod artifacts;
pub mod batch;

pub use artifacts::*;
pub use batch::*;
