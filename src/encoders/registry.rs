//! Encoder registry: category lists and label → code lookup.
//!
//! Codes are the position of a label in the class list the encoder was built
//! with. The list order comes from the artifact and is never re-sorted here, so
//! a registry is only meaningful together with the model trained against it.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;
use tracing::warn;

use crate::domain::Feature;

/// A categorical value the registry has never seen for a feature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category '{value}' for feature '{feature}'")]
pub struct UnknownCategoryError {
    pub feature: Feature,
    pub value: String,
}

/// Reasons an encoder bundle cannot become a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("encoder bundle has no entry for feature '{0}'")]
    MissingFeature(Feature),

    #[error("encoder for feature '{0}' has no categories")]
    EmptyFeature(Feature),

    #[error("encoder for feature '{feature}' lists category '{value}' more than once")]
    DuplicateCategory { feature: Feature, value: String },
}

/// A fitted label encoder for one feature.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
    codes: HashMap<String, u32>,
}

impl LabelEncoder {
    fn new(feature: Feature, classes: Vec<String>) -> Result<Self, RegistryError> {
        if classes.is_empty() {
            return Err(RegistryError::EmptyFeature(feature));
        }

        let mut codes = HashMap::with_capacity(classes.len());
        for (idx, label) in classes.iter().enumerate() {
            if codes.insert(label.clone(), idx as u32).is_some() {
                return Err(RegistryError::DuplicateCategory {
                    feature,
                    value: label.clone(),
                });
            }
        }

        Ok(Self { classes, codes })
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn code(&self, value: &str) -> Option<u32> {
        self.codes.get(value).copied()
    }
}

/// Immutable set of encoders, one per categorical [`Feature`].
#[derive(Debug, Clone)]
pub struct EncoderRegistry {
    encoders: HashMap<Feature, LabelEncoder>,
}

impl EncoderRegistry {
    /// Build a registry from the raw bundle (`artifact key → class list`).
    ///
    /// Every feature in [`Feature::ALL`] must be present. Extra keys are ignored.
    pub fn from_bundle(bundle: BTreeMap<String, Vec<String>>) -> Result<Self, RegistryError> {
        let mut by_feature: HashMap<Feature, Vec<String>> = HashMap::new();
        for (key, classes) in bundle {
            match Feature::from_artifact_key(&key) {
                Some(feature) => {
                    by_feature.insert(feature, classes);
                }
                None => warn!(key = %key, "ignoring encoder for unused feature"),
            }
        }

        let mut encoders = HashMap::with_capacity(Feature::ALL.len());
        for feature in Feature::ALL {
            let classes = by_feature
                .remove(&feature)
                .ok_or(RegistryError::MissingFeature(feature))?;
            encoders.insert(feature, LabelEncoder::new(feature, classes)?);
        }

        Ok(Self { encoders })
    }

    /// Known category labels for `feature`, in code order.
    pub fn categories_for(&self, feature: Feature) -> &[String] {
        self.encoders
            .get(&feature)
            .map(LabelEncoder::classes)
            .unwrap_or(&[])
    }

    /// Encode `value` for `feature`.
    ///
    /// Lookup is exact: no trimming or case folding.
    pub fn encode(&self, feature: Feature, value: &str) -> Result<u32, UnknownCategoryError> {
        self.encoders
            .get(&feature)
            .and_then(|enc| enc.code(value))
            .ok_or_else(|| UnknownCategoryError {
                feature,
                value: value.to_string(),
            })
    }

    /// Whether every categorical feature has an encoder.
    pub fn covers_all_features(&self) -> bool {
        Feature::ALL.iter().all(|f| self.encoders.contains_key(f))
    }

    /// `(feature, category count)` pairs for logging and debug output.
    pub fn summary(&self) -> Vec<(Feature, usize)> {
        Feature::ALL
            .iter()
            .map(|&f| (f, self.categories_for(f).len()))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    /// Small bundle shared by tests across the crate.
    pub(crate) fn sample_bundle() -> BTreeMap<String, Vec<String>> {
        let mut bundle = BTreeMap::new();
        // Deliberately not alphabetical: codes follow list position.
        bundle.insert("Make".to_string(), labels(&["TOYOTA", "BMW", "FORD", "HONDA"]));
        bundle.insert(
            "Vehicle Class".to_string(),
            labels(&["COMPACT", "SUV - SMALL", "PICKUP TRUCK - STANDARD"]),
        );
        bundle.insert("Transmission".to_string(), labels(&["A6", "AS5", "M6"]));
        bundle.insert("Fuel Type".to_string(), labels(&["D", "E", "N", "X", "Z"]));
        bundle
    }

    pub(crate) fn sample_registry() -> EncoderRegistry {
        EncoderRegistry::from_bundle(sample_bundle()).unwrap()
    }

    #[test]
    fn codes_follow_stored_order() {
        let registry = sample_registry();
        assert_eq!(registry.encode(Feature::Make, "TOYOTA").unwrap(), 0);
        assert_eq!(registry.encode(Feature::Make, "BMW").unwrap(), 1);
        assert_eq!(registry.encode(Feature::FuelType, "Z").unwrap(), 4);
    }

    #[test]
    fn categories_preserve_artifact_order() {
        let registry = sample_registry();
        assert_eq!(
            registry.categories_for(Feature::Make),
            &labels(&["TOYOTA", "BMW", "FORD", "HONDA"])[..]
        );
    }

    #[test]
    fn unknown_category_is_an_error() {
        let registry = sample_registry();
        let err = registry.encode(Feature::Make, "NotARealBrand").unwrap_err();
        assert_eq!(err.feature, Feature::Make);
        assert_eq!(err.value, "NotARealBrand");
        assert_eq!(
            err.to_string(),
            "unknown category 'NotARealBrand' for feature 'Make'"
        );

        // The registry is unaffected by the failed lookup.
        assert_eq!(registry.encode(Feature::Make, "FORD").unwrap(), 2);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let registry = sample_registry();
        assert!(registry.encode(Feature::Make, "toyota").is_err());
        assert!(registry.encode(Feature::Make, " TOYOTA").is_err());
    }

    #[test]
    fn missing_feature_is_rejected() {
        let mut bundle = sample_bundle();
        bundle.remove("Transmission");
        let err = EncoderRegistry::from_bundle(bundle).unwrap_err();
        assert_eq!(err, RegistryError::MissingFeature(Feature::Transmission));
    }

    #[test]
    fn duplicate_and_empty_classes_are_rejected() {
        let mut bundle = sample_bundle();
        bundle.insert("Fuel Type".to_string(), labels(&["X", "Z", "X"]));
        assert!(matches!(
            EncoderRegistry::from_bundle(bundle),
            Err(RegistryError::DuplicateCategory { feature: Feature::FuelType, .. })
        ));

        let mut bundle = sample_bundle();
        bundle.insert("Make".to_string(), Vec::new());
        assert_eq!(
            EncoderRegistry::from_bundle(bundle).unwrap_err(),
            RegistryError::EmptyFeature(Feature::Make)
        );
    }

    #[test]
    fn extra_keys_are_ignored() {
        let mut bundle = sample_bundle();
        bundle.insert("Model Year".to_string(), labels(&["2014"]));
        let registry = EncoderRegistry::from_bundle(bundle).unwrap();
        assert!(registry.covers_all_features());
    }
}
