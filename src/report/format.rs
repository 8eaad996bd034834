//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the encoding/inference code stays clean and testable
//! - output changes are localized (important for snapshot-style tests)

use serde::Serialize;

use crate::domain::{EmissionTier, Feature, PredictionResult, VehicleSpec};
use crate::error::{AppError, EXIT_RUNTIME};
use crate::io::batch::BatchSummary;

/// One-line verdict shown under the estimate.
pub fn tier_message(tier: EmissionTier) -> &'static str {
    match tier {
        EmissionTier::Low => "This vehicle is fairly environmentally friendly.",
        EmissionTier::Medium => "This vehicle's emissions are moderate.",
        EmissionTier::High => "This vehicle is highly polluting!",
    }
}

/// Extra suggestion, only for the worst tier.
pub fn tier_advice(tier: EmissionTier) -> Option<&'static str> {
    match tier {
        EmissionTier::High => {
            Some("Consider a hybrid or electric vehicle to reduce your carbon footprint.")
        }
        EmissionTier::Low | EmissionTier::Medium => None,
    }
}

/// Text block for `co2 predict`.
pub fn format_prediction(spec: &VehicleSpec, result: &PredictionResult) -> String {
    let mut out = String::new();
    out.push_str("=== co2 - Vehicle CO2 Emission Estimate ===\n");
    out.push_str(&format!(
        "Vehicle: {} | {} | {} | fuel {}\n",
        spec.make, spec.vehicle_class, spec.transmission, spec.fuel_type_code
    ));
    out.push_str(&format!(
        "Engine: {:.1} L, {} cyl | Consumption: {:.1} L/100 km\n",
        spec.engine_size_liters, spec.cylinder_count, spec.fuel_combined
    ));
    out.push_str(&format!("Estimated CO2: {:.2} g/km\n", result.value_grams_per_km));
    out.push_str(&format!("{}: {}", result.tier.display_name(), tier_message(result.tier)));
    if let Some(advice) = tier_advice(result.tier) {
        out.push('\n');
        out.push_str(advice);
    }
    out
}

#[derive(Serialize)]
struct PredictionJson<'a> {
    input: &'a VehicleSpec,
    co2_g_per_km: f64,
    tier: EmissionTier,
    message: &'static str,
}

/// JSON document for `co2 predict --json`.
pub fn format_prediction_json(spec: &VehicleSpec, result: &PredictionResult) -> Result<String, AppError> {
    let doc = PredictionJson {
        input: spec,
        co2_g_per_km: result.value_grams_per_km,
        tier: result.tier,
        message: tier_message(result.tier),
    };
    serde_json::to_string_pretty(&doc)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Failed to encode JSON: {e}")))
}

/// Listing for `co2 categories`, one label per line with its code.
///
/// `describe` can add a human-readable note per label (used for fuel codes).
pub fn format_categories(
    feature: Feature,
    categories: &[String],
    describe: impl Fn(&str) -> Option<&'static str>,
) -> String {
    let mut out = format!("{} ({} categories)\n", feature, categories.len());
    for (code, label) in categories.iter().enumerate() {
        match describe(label) {
            Some(note) => out.push_str(&format!("{code:>4}  {label}  ({note})\n")),
            None => out.push_str(&format!("{code:>4}  {label}\n")),
        }
    }
    out
}

/// Summary line printed to stderr after `co2 batch`.
pub fn format_batch_summary(summary: &BatchSummary) -> String {
    format!(
        "Scored {}/{} rows ({} failed) | low: {} | medium: {} | high: {}",
        summary.scored, summary.rows, summary.failed, summary.low, summary.medium, summary.high
    )
}
