//! Command-line parsing for the CO2 emission estimator.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the encoding/inference code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{Feature, VehicleSpec};
use crate::io::artifacts::ArtifactPaths;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "co2", version, about = "Vehicle CO2 emission estimator")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct GlobalArgs {
    /// Model artifact (JSON).
    #[arg(long, global = true, env = "CO2_MODEL_PATH", default_value = "co2_model.json")]
    pub model: PathBuf,

    /// Encoder bundle artifact (JSON).
    #[arg(long, global = true, env = "CO2_ENCODERS_PATH", default_value = "label_encoders.json")]
    pub encoders: PathBuf,

    /// Write logs to this file instead of stderr.
    ///
    /// The TUI logs to `co2_tui.log` when this is not set.
    #[arg(long, global = true, env = "CO2_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalArgs {
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model.clone(),
            encoders: self.encoders.clone(),
        }
    }
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Launch the interactive form (default).
    Tui,
    /// Estimate emissions for a single vehicle.
    Predict(PredictArgs),
    /// List the known categories for a categorical feature.
    Categories(CategoriesArgs),
    /// Score a CSV of vehicles and write a results CSV.
    Batch(BatchArgs),
}

/// A single vehicle described on the command line.
#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Manufacturer, e.g. TOYOTA.
    #[arg(long)]
    pub make: String,

    /// Vehicle class, e.g. COMPACT.
    #[arg(long)]
    pub vehicle_class: String,

    /// Transmission code, e.g. AS5.
    #[arg(long)]
    pub transmission: String,

    /// Fuel type code: X (regular), Z (premium), D (diesel), E (E85), N (natural gas).
    #[arg(long)]
    pub fuel: String,

    /// Engine size in liters (0.0 - 10.0).
    #[arg(long)]
    pub engine_size: f64,

    /// Number of cylinders (3 - 16).
    #[arg(long)]
    pub cylinders: u32,

    /// Combined fuel consumption in L/100 km (1.0 - 50.0).
    #[arg(long)]
    pub fuel_comb: f64,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PredictArgs {
    pub fn to_spec(&self) -> VehicleSpec {
        VehicleSpec {
            make: self.make.clone(),
            vehicle_class: self.vehicle_class.clone(),
            transmission: self.transmission.clone(),
            fuel_type_code: self.fuel.clone(),
            engine_size_liters: self.engine_size,
            cylinder_count: self.cylinders,
            fuel_combined: self.fuel_comb,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct CategoriesArgs {
    /// Feature to list.
    #[arg(value_enum)]
    pub feature: Feature,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Input CSV with one vehicle per row.
    #[arg(short, long, value_name = "CSV")]
    pub input: PathBuf,

    /// Results CSV (stdout when omitted).
    #[arg(short, long, value_name = "CSV")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_predict_with_global_paths() {
        let cli = Cli::try_parse_from([
            "co2",
            "predict",
            "--make",
            "TOYOTA",
            "--vehicle-class",
            "COMPACT",
            "--transmission",
            "AS5",
            "--fuel",
            "Z",
            "--engine-size",
            "2.0",
            "--cylinders",
            "4",
            "--fuel-comb",
            "8.5",
            "--model",
            "m.json",
        ])
        .unwrap();

        assert_eq!(cli.global.model, PathBuf::from("m.json"));
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        let spec = args.to_spec();
        assert_eq!(spec.fuel_type_code, "Z");
        assert_eq!(spec.cylinder_count, 4);
        assert!(!args.json);
    }

    #[test]
    fn categories_takes_kebab_case_feature() {
        let cli = Cli::try_parse_from(["co2", "categories", "vehicle-class"]).unwrap();
        let Command::Categories(args) = cli.command else {
            panic!("expected categories");
        };
        assert_eq!(args.feature, Feature::VehicleClass);
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["co2", "-vv", "tui"]).unwrap();
        assert_eq!(cli.global.verbose, 2);
    }
}
