//! `co2-estimator` library crate.
//!
//! The binary (`co2`) is a thin wrapper around this library so that:
//!
//! - the encode/predict/classify pipeline is testable without a terminal
//! - the TUI, `predict` and `batch` front-ends share one implementation
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod classify;
pub mod cli;
pub mod debug;
pub mod domain;
pub mod encoders;
pub mod error;
pub mod features;
pub mod io;
pub mod models;
pub mod report;
pub mod tui;
