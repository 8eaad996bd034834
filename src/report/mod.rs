//! Reporting utilities: tier messages and formatted terminal output.

pub mod format;

pub use format::*;
