//! Build the model's feature vector from a vehicle description.
//!
//! Layout (fixed, must match training):
//!
//! `[make, vehicle_class, transmission, fuel_type, engine_size, cylinders, fuel_comb]`
//!
//! The four categorical values are replaced by their encoder codes; the numeric
//! values pass through unchanged after a range check. Front-ends enforce the same
//! ranges, but this is the last gate before the model so it checks again.

use thiserror::Error;

use crate::domain::{FEATURE_COUNT, Feature, FeatureVector, NumericField, VehicleSpec};
use crate::encoders::{EncoderRegistry, UnknownCategoryError};

/// A numeric input outside its documented domain (or not finite).
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field} = {value} is outside the accepted range [{min}, {max}]")]
pub struct InvalidRangeError {
    pub field: NumericField,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// Why a `VehicleSpec` could not be turned into a feature vector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    UnknownCategory(#[from] UnknownCategoryError),

    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
}

/// Encode and order `spec` for the model.
///
/// Categorical fields are checked first, in feature order, so the reported
/// error is always the first offending field.
pub fn assemble(registry: &EncoderRegistry, spec: &VehicleSpec) -> Result<FeatureVector, AssemblyError> {
    let mut values = Vec::with_capacity(FEATURE_COUNT);

    for feature in Feature::ALL {
        let code = registry.encode(feature, spec.categorical(feature))?;
        values.push(f64::from(code));
    }

    for field in NumericField::ALL {
        values.push(validated(field, spec.numeric(field))?);
    }

    Ok(FeatureVector::from_values(values))
}

/// Return `value` if it lies inside the domain of `field`.
pub fn validated(field: NumericField, value: f64) -> Result<f64, InvalidRangeError> {
    if field.contains(value) {
        return Ok(value);
    }
    let (min, max) = field.domain();
    Err(InvalidRangeError {
        field,
        value,
        min,
        max,
    })
}
