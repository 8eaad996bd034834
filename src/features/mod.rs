//! Feature assembly: `VehicleSpec` → ordered model input.

pub mod assemble;

pub use assemble::*;
