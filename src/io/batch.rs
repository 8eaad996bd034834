//! CSV batch scoring.
//!
//! Reads one vehicle per row, scores every row independently (in parallel), and
//! writes the input fields plus the estimate and tier back out in input order.
//!
//! Accepted headers are the `VehicleSpec` field names, their short forms
//! (`fuel_type`, `engine_size`, `cylinders`, `fuel_comb`) or the column names of
//! the fuel consumption ratings dataset. Unknown columns are ignored.
//!
//! Row-level problems (unparseable row, unknown category, out-of-range value)
//! are reported per row. A model contract violation aborts the whole batch.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::app::pipeline::{InferencePipeline, PipelineError};
use crate::domain::{EmissionTier, PredictionResult, VehicleSpec};
use crate::error::{AppError, EXIT_INPUT};

/// One input row after CSV parsing.
#[derive(Debug, Clone)]
pub struct InputRow {
    /// 1-based line number in the source file.
    pub line: usize,
    pub spec: Result<VehicleSpec, String>,
}

/// One row after scoring.
#[derive(Debug, Clone)]
pub struct ScoredRow {
    pub line: usize,
    pub spec: Option<VehicleSpec>,
    pub outcome: Result<PredictionResult, String>,
}

/// Counts for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub rows: usize,
    pub scored: usize,
    pub failed: usize,
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

/// Read vehicle rows from a CSV file.
pub fn read_specs_csv(path: &Path) -> Result<Vec<InputRow>, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_specs(file)
}

/// Read vehicle rows from any CSV source.
pub fn read_specs<R: Read>(source: R) -> Result<Vec<InputRow>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    // Fail early on an unreadable header; row errors are collected instead.
    reader
        .headers()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to read CSV headers: {e}")))?;

    let rows = reader
        .deserialize::<VehicleSpec>()
        .enumerate()
        .map(|(idx, result)| InputRow {
            // +2: 1-based lines, and the header occupies line 1.
            line: idx + 2,
            spec: result.map_err(|e| format!("CSV parse error: {e}")),
        })
        .collect();

    Ok(rows)
}

/// Score all rows in parallel, preserving input order.
///
/// Returns `Err` only for a contract violation, since it would repeat for
/// every row.
pub fn score_rows(pipeline: &InferencePipeline, rows: Vec<InputRow>) -> Result<Vec<ScoredRow>, PipelineError> {
    rows.into_par_iter()
        .map(|row| match row.spec {
            Err(message) => Ok(ScoredRow {
                line: row.line,
                spec: None,
                outcome: Err(message),
            }),
            Ok(spec) => match pipeline.run_inference(&spec) {
                Ok(result) => Ok(ScoredRow {
                    line: row.line,
                    spec: Some(spec),
                    outcome: Ok(result),
                }),
                Err(err) if err.is_recoverable() => Ok(ScoredRow {
                    line: row.line,
                    spec: Some(spec),
                    outcome: Err(err.to_string()),
                }),
                Err(err) => Err(err),
            },
        })
        .collect()
}

/// Tally outcomes for the summary line.
pub fn summarize(rows: &[ScoredRow]) -> BatchSummary {
    let mut summary = BatchSummary {
        rows: rows.len(),
        ..BatchSummary::default()
    };
    for row in rows {
        match &row.outcome {
            Ok(result) => {
                summary.scored += 1;
                match result.tier {
                    EmissionTier::Low => summary.low += 1,
                    EmissionTier::Medium => summary.medium += 1,
                    EmissionTier::High => summary.high += 1,
                }
            }
            Err(_) => summary.failed += 1,
        }
    }
    summary
}

#[derive(Serialize)]
struct OutputRecord<'a> {
    line: usize,
    make: &'a str,
    vehicle_class: &'a str,
    transmission: &'a str,
    fuel_type: &'a str,
    engine_size: Option<f64>,
    cylinders: Option<u32>,
    fuel_comb: Option<f64>,
    co2_g_per_km: Option<String>,
    tier: Option<EmissionTier>,
    error: &'a str,
}

impl<'a> OutputRecord<'a> {
    fn from_row(row: &'a ScoredRow) -> Self {
        let spec = row.spec.as_ref();
        let (estimate, tier, error) = match &row.outcome {
            Ok(r) => (Some(format!("{:.2}", r.value_grams_per_km)), Some(r.tier), ""),
            Err(message) => (None, None, message.as_str()),
        };
        Self {
            line: row.line,
            make: spec.map(|s| s.make.as_str()).unwrap_or(""),
            vehicle_class: spec.map(|s| s.vehicle_class.as_str()).unwrap_or(""),
            transmission: spec.map(|s| s.transmission.as_str()).unwrap_or(""),
            fuel_type: spec.map(|s| s.fuel_type_code.as_str()).unwrap_or(""),
            engine_size: spec.map(|s| s.engine_size_liters),
            cylinders: spec.map(|s| s.cylinder_count),
            fuel_comb: spec.map(|s| s.fuel_combined),
            co2_g_per_km: estimate,
            tier,
            error,
        }
    }
}

/// Write scored rows as CSV to `path`, or stdout when `path` is `None`.
pub fn write_results(path: Option<&Path>, rows: &[ScoredRow]) -> Result<(), AppError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::new(EXIT_INPUT, format!("Failed to create results CSV '{}': {e}", path.display()))
            })?;
            write_results_to(file, rows)?;
            info!(path = %path.display(), rows = rows.len(), "wrote batch results");
            Ok(())
        }
        None => write_results_to(io::stdout().lock(), rows),
    }
}

/// Write scored rows as CSV to any sink.
pub fn write_results_to<W: Write>(sink: W, rows: &[ScoredRow]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(sink);
    for row in rows {
        writer
            .serialize(OutputRecord::from_row(row))
            .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to write results CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(EXIT_INPUT, format!("Failed to flush results CSV: {e}")))?;
    Ok(())
}
