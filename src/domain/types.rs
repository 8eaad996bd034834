//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - filled in by the terminal form or the command line
//! - read from / written to batch CSV files
//! - emitted as JSON by `co2 predict --json`

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Number of elements in a model input vector.
pub const FEATURE_COUNT: usize = 7;

/// Canonical feature names, in the order the model was trained with.
///
/// Model artifacts must carry exactly this list in `feature_names`.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "Make",
    "Vehicle Class",
    "Transmission",
    "Fuel Type",
    "Engine Size(L)",
    "Cylinders",
    "Fuel Consumption Comb (L/100 km)",
];

/// A categorical input feature backed by an encoder in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Feature {
    Make,
    VehicleClass,
    Transmission,
    FuelType,
}

impl Feature {
    /// Categorical features in feature-vector order.
    pub const ALL: [Feature; 4] = [
        Feature::Make,
        Feature::VehicleClass,
        Feature::Transmission,
        Feature::FuelType,
    ];

    /// Key used for this feature in the encoder bundle.
    pub fn artifact_key(self) -> &'static str {
        match self {
            Feature::Make => "Make",
            Feature::VehicleClass => "Vehicle Class",
            Feature::Transmission => "Transmission",
            Feature::FuelType => "Fuel Type",
        }
    }

    /// Resolve an encoder bundle key back to a feature.
    pub fn from_artifact_key(key: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.artifact_key() == key)
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.artifact_key())
    }
}

/// A numeric input field and its accepted domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericField {
    EngineSize,
    Cylinders,
    FuelCombined,
}

impl NumericField {
    pub const ALL: [NumericField; 3] = [
        NumericField::EngineSize,
        NumericField::Cylinders,
        NumericField::FuelCombined,
    ];

    /// Inclusive `(min, max)` domain.
    pub fn domain(self) -> (f64, f64) {
        match self {
            NumericField::EngineSize => (0.0, 10.0),
            NumericField::Cylinders => (3.0, 16.0),
            NumericField::FuelCombined => (1.0, 50.0),
        }
    }

    /// Whether `value` is finite and inside the domain.
    pub fn contains(self, value: f64) -> bool {
        let (min, max) = self.domain();
        value.is_finite() && value >= min && value <= max
    }

    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            NumericField::EngineSize => "engine size (L)",
            NumericField::Cylinders => "cylinders",
            NumericField::FuelCombined => "fuel consumption (L/100 km)",
        }
    }
}

impl std::fmt::Display for NumericField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A vehicle description as submitted by a front-end.
///
/// Categorical fields carry the raw registry labels; `fuel_type_code` is the
/// single-character dataset code (`X`, `Z`, `D`, `E`, `N`), never a display label.
///
/// The serde aliases accept the column names of the training dataset so
/// batch CSVs exported from it can be scored directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    #[serde(alias = "Make")]
    pub make: String,
    #[serde(alias = "Vehicle Class")]
    pub vehicle_class: String,
    #[serde(alias = "Transmission")]
    pub transmission: String,
    #[serde(alias = "fuel_type", alias = "Fuel Type")]
    pub fuel_type_code: String,
    #[serde(alias = "engine_size", alias = "Engine Size(L)")]
    pub engine_size_liters: f64,
    #[serde(alias = "cylinders", alias = "Cylinders")]
    pub cylinder_count: u32,
    #[serde(alias = "fuel_comb", alias = "Fuel Consumption Comb (L/100 km)")]
    pub fuel_combined: f64,
}

impl VehicleSpec {
    /// Raw categorical value for `feature`.
    pub fn categorical(&self, feature: Feature) -> &str {
        match feature {
            Feature::Make => &self.make,
            Feature::VehicleClass => &self.vehicle_class,
            Feature::Transmission => &self.transmission,
            Feature::FuelType => &self.fuel_type_code,
        }
    }

    /// Numeric value for `field` (cylinders widened to `f64`).
    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::EngineSize => self.engine_size_liters,
            NumericField::Cylinders => f64::from(self.cylinder_count),
            NumericField::FuelCombined => self.fuel_combined,
        }
    }
}

/// Ordered numeric model input.
///
/// Produced by `features::assemble` with exactly [`FEATURE_COUNT`] values in
/// [`FEATURE_NAMES`] order. `from_values` exists so callers (and tests) can feed
/// arbitrary vectors to a model; the model rejects wrong shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn from_values(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Qualitative severity bucket for a CO2 estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmissionTier {
    Low,
    Medium,
    High,
}

impl EmissionTier {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            EmissionTier::Low => "Low Emission",
            EmissionTier::Medium => "Medium Emission",
            EmissionTier::High => "High Emission",
        }
    }
}

impl std::fmt::Display for EmissionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Output of a single successful inference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Estimated CO2 emissions in g/km.
    pub value_grams_per_km: f64,
    pub tier: EmissionTier,
}
