//! Debug bundle writer for inspecting a single request end to end.
//!
//! The bundle records the raw form values, the encoded feature vector, the
//! prediction (or the error that stopped it) and the encoder registry sizes.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::app::pipeline::InferencePipeline;
use crate::domain::{FEATURE_NAMES, VehicleSpec};
use crate::error::{AppError, EXIT_RUNTIME};

/// Write a bundle for `spec` under `./debug`.
pub fn write_debug_bundle(pipeline: &InferencePipeline, spec: &VehicleSpec) -> Result<PathBuf, AppError> {
    write_debug_bundle_in(Path::new("debug"), pipeline, spec)
}

pub fn write_debug_bundle_in(
    dir: &Path,
    pipeline: &InferencePipeline,
    spec: &VehicleSpec,
) -> Result<PathBuf, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to create debug dir: {e}")))?;

    let ts = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("co2_debug_{}_{ts}.md", file_safe(&spec.make)));

    let mut file = File::create(&path)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to create debug file: {e}")))?;

    write_bundle(&mut file, pipeline, spec)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to write debug: {e}")))?;

    Ok(path)
}

fn write_bundle<W: Write>(out: &mut W, pipeline: &InferencePipeline, spec: &VehicleSpec) -> std::io::Result<()> {
    writeln!(out, "# co2 debug bundle")?;
    writeln!(out, "- generated: {}", Local::now().to_rfc3339())?;

    writeln!(out, "\n## Input")?;
    writeln!(out, "| field | value |")?;
    writeln!(out, "| - | - |")?;
    writeln!(out, "| make | {} |", spec.make)?;
    writeln!(out, "| vehicle_class | {} |", spec.vehicle_class)?;
    writeln!(out, "| transmission | {} |", spec.transmission)?;
    writeln!(out, "| fuel_type | {} |", spec.fuel_type_code)?;
    writeln!(out, "| engine_size | {:.3} |", spec.engine_size_liters)?;
    writeln!(out, "| cylinders | {} |", spec.cylinder_count)?;
    writeln!(out, "| fuel_comb | {:.3} |", spec.fuel_combined)?;

    writeln!(out, "\n## Feature vector")?;
    match pipeline.features(spec) {
        Ok(vector) => {
            writeln!(out, "| idx | feature | value |")?;
            writeln!(out, "| - | - | - |")?;
            for (idx, (name, value)) in FEATURE_NAMES.iter().zip(vector.as_slice()).enumerate() {
                writeln!(out, "| {idx} | {name} | {value} |")?;
            }
        }
        Err(err) => writeln!(out, "Encoding failed: {err}")?,
    }

    writeln!(out, "\n## Prediction")?;
    match pipeline.run_inference(spec) {
        Ok(result) => {
            writeln!(out, "- co2_g_per_km: {:.4}", result.value_grams_per_km)?;
            writeln!(out, "- tier: {}", result.tier.display_name())?;
        }
        Err(err) => {
            writeln!(out, "- error: {err}")?;
            writeln!(out, "- recoverable: {}", err.is_recoverable())?;
        }
    }

    writeln!(out, "\n## Encoders")?;
    writeln!(out, "| feature | categories |")?;
    writeln!(out, "| - | - |")?;
    for (feature, count) in pipeline.registry().summary() {
        writeln!(out, "| {feature} | {count} |")?;
    }

    Ok(())
}

fn file_safe(label: &str) -> String {
    let cleaned: String = label
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if cleaned.is_empty() { "vehicle".to_string() } else { cleaned }
}
