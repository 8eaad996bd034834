//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - loads the model + encoder artifacts once
//! - dispatches to the TUI, `predict`, `categories` or `batch`

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use tracing::{Level, info};

use crate::cli::{BatchArgs, CategoriesArgs, Command, PredictArgs};
use crate::domain::Feature;
use crate::error::{AppError, EXIT_INPUT};
use crate::io::artifacts::load_pipeline;

pub mod pipeline;

use pipeline::InferencePipeline;

/// Entry point for the `co2` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();

    // We want bare `co2` and `co2 --model m.json` to behave like `co2 tui ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let is_tui = matches!(cli.command, Command::Tui);
    init_logging(cli.global.verbose, cli.global.log_file.as_deref(), is_tui)?;

    let paths = cli.global.artifact_paths();
    let pipeline = load_pipeline(&paths)?;
    info!(
        model = %paths.model.display(),
        encoders = %paths.encoders.display(),
        "artifacts loaded"
    );

    match cli.command {
        Command::Tui => crate::tui::run(pipeline),
        Command::Predict(args) => handle_predict(&pipeline, &args),
        Command::Categories(args) => handle_categories(&pipeline, &args),
        Command::Batch(args) => handle_batch(&pipeline, &args),
    }
}

fn handle_predict(pipeline: &InferencePipeline, args: &PredictArgs) -> Result<(), AppError> {
    let spec = args.to_spec();
    let result = pipeline.run_inference(&spec)?;

    if args.json {
        println!("{}", crate::report::format_prediction_json(&spec, &result)?);
    } else {
        println!("{}", crate::report::format_prediction(&spec, &result));
    }
    Ok(())
}

fn handle_categories(pipeline: &InferencePipeline, args: &CategoriesArgs) -> Result<(), AppError> {
    let categories = pipeline.registry().categories_for(args.feature);
    let text = match args.feature {
        Feature::FuelType => {
            crate::report::format_categories(args.feature, categories, crate::tui::form::fuel_label_for_code)
        }
        _ => crate::report::format_categories(args.feature, categories, |_| None),
    };
    print!("{text}");
    Ok(())
}

fn handle_batch(pipeline: &InferencePipeline, args: &BatchArgs) -> Result<(), AppError> {
    let rows = crate::io::batch::read_specs_csv(&args.input)?;
    info!(rows = rows.len(), input = %args.input.display(), "scoring batch");

    let scored = crate::io::batch::score_rows(pipeline, rows)?;
    crate::io::batch::write_results(args.output.as_deref(), &scored)?;

    let summary = crate::io::batch::summarize(&scored);
    eprintln!("{}", crate::report::format_batch_summary(&summary));
    Ok(())
}

/// Log file used by the TUI when `--log-file` is not given.
pub const DEFAULT_TUI_LOG_FILE: &str = "co2_tui.log";

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// The TUI owns the terminal, so it always logs to a file: `log_file` when
/// given, otherwise [`DEFAULT_TUI_LOG_FILE`].
fn log_target(log_file: Option<&Path>, is_tui: bool) -> LogTarget {
    match log_file {
        Some(path) => LogTarget::File(path.to_path_buf()),
        None if is_tui => LogTarget::File(PathBuf::from(DEFAULT_TUI_LOG_FILE)),
        None => LogTarget::Stderr,
    }
}

/// Install the global `tracing` subscriber.
///
/// - default level is WARN; `-v` is INFO, `-vv` and above is DEBUG
/// - see [`log_target`] for the destination
fn init_logging(verbose: u8, log_file: Option<&Path>, is_tui: bool) -> Result<(), AppError> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    match log_target(log_file, is_tui) {
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    AppError::new(EXIT_INPUT, format!("Failed to open log file {}: {e}", path.display()))
                })?;
            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_max_level(level)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    Ok(())
}

/// Rewrite argv so `co2` defaults to `co2 tui`.
///
/// Rules:
/// - `co2`                      -> `co2 tui`
/// - `co2 --model m.json ...`   -> `co2 tui --model m.json ...`
/// - `co2 --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "tui" | "predict" | "categories" | "batch");
    if is_subcommand {
        return argv;
    }

    // Global flags may come before the subcommand; only default to the TUI
    // when no subcommand appears anywhere.
    if arg1.starts_with('-') {
        let has_subcommand = argv
            .iter()
            .skip(1)
            .any(|a| matches!(a.as_str(), "tui" | "predict" | "categories" | "batch"));
        if !has_subcommand {
            argv.insert(1, "tui".to_string());
        }
        return argv;
    }

    argv
}
