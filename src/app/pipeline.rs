//! Shared inference pipeline used by the TUI, `co2 predict` and `co2 batch`.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! assemble (encode + range check) -> predict -> classify
//!
//! The front-ends can then focus on presentation (widgets, stdout, CSV).

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::classify::classify;
use crate::domain::{FEATURE_COUNT, FeatureVector, PredictionResult, VehicleSpec};
use crate::encoders::EncoderRegistry;
use crate::features::{AssemblyError, assemble};
use crate::models::{ContractViolation, Regressor};

/// Which stage of [`InferencePipeline::run_inference`] failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Encoding,
    Inference,
}

/// A failed inference for one `VehicleSpec`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    Encoding(#[from] AssemblyError),

    #[error("model contract violated: {0}")]
    Contract(#[from] ContractViolation),

    #[error("model returned a non-finite prediction ({0})")]
    NonFinitePrediction(f64),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Encoding(_) => Stage::Encoding,
            PipelineError::Contract(_) | PipelineError::NonFinitePrediction(_) => Stage::Inference,
        }
    }

    /// Whether the error is specific to this request.
    ///
    /// Contract violations come from mismatched artifacts and would repeat for
    /// every request.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PipelineError::Contract(_))
    }
}

/// Encoder registry + model, wired together once at startup.
///
/// Both halves are shared read-only, so the pipeline is cheap to clone and
/// safe to use from several threads.
#[derive(Clone)]
pub struct InferencePipeline {
    registry: Arc<EncoderRegistry>,
    model: Arc<dyn Regressor>,
}

impl std::fmt::Debug for InferencePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("registry", &self.registry.summary())
            .field("model_features", &self.model.feature_count())
            .finish()
    }
}

impl InferencePipeline {
    /// Wire a registry and a model, checking that they agree on the schema.
    pub fn new(
        registry: Arc<EncoderRegistry>,
        model: Arc<dyn Regressor>,
    ) -> Result<Self, ContractViolation> {
        if !registry.covers_all_features() {
            error!("encoder registry does not cover every categorical feature");
            return Err(ContractViolation::IncompleteRegistry);
        }
        if model.feature_count() != FEATURE_COUNT {
            error!(
                expected = FEATURE_COUNT,
                actual = model.feature_count(),
                "model feature count does not match feature assembly"
            );
            return Err(ContractViolation::Shape {
                expected: FEATURE_COUNT,
                actual: model.feature_count(),
            });
        }
        Ok(Self { registry, model })
    }

    pub fn registry(&self) -> &EncoderRegistry {
        &self.registry
    }

    /// Encode `spec` without running the model.
    pub fn features(&self, spec: &VehicleSpec) -> Result<FeatureVector, PipelineError> {
        Ok(assemble(&self.registry, spec)?)
    }

    /// Run `classify(predict(assemble(spec)))`.
    ///
    /// Either a complete result or the error of the first failing stage.
    pub fn run_inference(&self, spec: &VehicleSpec) -> Result<PredictionResult, PipelineError> {
        let features = self.features(spec)?;

        let raw = self.model.predict(&features).inspect_err(|err| {
            error!(error = %err, "model rejected assembled feature vector");
        })?;
        if !raw.is_finite() {
            return Err(PipelineError::NonFinitePrediction(raw));
        }

        let value = if raw < 0.0 {
            warn!(raw, "negative CO2 prediction clamped to zero");
            0.0
        } else {
            raw
        };

        let result = PredictionResult {
            value_grams_per_km: value,
            tier: classify(value),
        };
        debug!(
            make = %spec.make,
            value = result.value_grams_per_km,
            tier = ?result.tier,
            "inference complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::domain::{EmissionTier, Feature};
    use crate::encoders::registry::tests::sample_registry;
    use crate::features::assemble::tests::toyota_compact;
    use crate::models::model::tests::sample_model;

    fn pipeline() -> InferencePipeline {
        InferencePipeline::new(Arc::new(sample_registry()), Arc::new(sample_model())).unwrap()
    }

    /// Returns a fixed value regardless of input.
    struct Constant {
        value: f64,
        features: usize,
    }

    impl Regressor for Constant {
        fn feature_count(&self) -> usize {
            self.features
        }

        fn predict(&self, features: &FeatureVector) -> Result<f64, ContractViolation> {
            if features.len() != self.features {
                return Err(ContractViolation::Shape {
                    expected: self.features,
                    actual: features.len(),
                });
            }
            Ok(self.value)
        }
    }

    /// Reports the right width but rejects every vector, like a model built
    /// against another feature layout.
    struct Mismatched;

    impl Regressor for Mismatched {
        fn feature_count(&self) -> usize {
            FEATURE_COUNT
        }

        fn predict(&self, features: &FeatureVector) -> Result<f64, ContractViolation> {
            Err(ContractViolation::Shape {
                expected: FEATURE_COUNT + 1,
                actual: features.len(),
            })
        }
    }

    pub(crate) fn with_mismatched_model() -> InferencePipeline {
        InferencePipeline::new(Arc::new(sample_registry()), Arc::new(Mismatched)).unwrap()
    }

    fn with_constant(value: f64) -> InferencePipeline {
        InferencePipeline::new(
            Arc::new(sample_registry()),
            Arc::new(Constant { value, features: 7 }),
        )
        .unwrap()
    }

    #[test]
    fn end_to_end_example() {
        let result = pipeline().run_inference(&toyota_compact()).unwrap();
        // fuel_comb 8.5 -> 110, fuel Z -> 0, base 100
        assert_eq!(result.value_grams_per_km, 210.0);
        assert_eq!(result.tier, EmissionTier::Medium);
    }

    #[test]
    fn identical_specs_give_identical_results() {
        let p = pipeline();
        let a = p.run_inference(&toyota_compact()).unwrap();
        let b = p.run_inference(&toyota_compact()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_category_is_recoverable_and_pipeline_keeps_serving() {
        let p = pipeline();
        let mut bad = toyota_compact();
        bad.make = "NotARealBrand".to_string();

        let err = p.run_inference(&bad).unwrap_err();
        assert_eq!(err.stage(), Stage::Encoding);
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("NotARealBrand"));

        assert!(p.run_inference(&toyota_compact()).is_ok());
    }

    #[test]
    fn range_errors_are_encoding_stage() {
        let mut spec = toyota_compact();
        spec.fuel_combined = 0.5;
        let err = pipeline().run_inference(&spec).unwrap_err();
        assert_eq!(err.stage(), Stage::Encoding);
        assert!(matches!(err, PipelineError::Encoding(AssemblyError::InvalidRange(_))));
    }

    #[test]
    fn model_with_wrong_width_is_rejected_at_construction() {
        let err = InferencePipeline::new(
            Arc::new(sample_registry()),
            Arc::new(Constant { value: 1.0, features: 6 }),
        )
        .unwrap_err();
        assert_eq!(err, ContractViolation::Shape { expected: 7, actual: 6 });
    }

    #[test]
    fn contract_violation_from_the_model_is_not_recoverable() {
        let p = with_mismatched_model();
        let err = p.run_inference(&toyota_compact()).unwrap_err();
        assert_eq!(err.stage(), Stage::Inference);
        assert!(!err.is_recoverable());
        assert!(matches!(err, PipelineError::Contract(ContractViolation::Shape { .. })));
    }

    #[test]
    fn unvalidated_model_with_bad_split_feature_does_not_panic() {
        use crate::models::{ModelParams, TreeNode};

        let mut model = sample_model();
        if let ModelParams::Gbtree { trees, .. } = &mut model.model {
            trees[0].nodes[0] = TreeNode::Split {
                feature: 9,
                threshold: 8.0,
                left: 1,
                right: 2,
            };
        }
        let p = InferencePipeline::new(Arc::new(sample_registry()), Arc::new(model)).unwrap();

        let err = p.run_inference(&toyota_compact()).unwrap_err();
        assert!(!err.is_recoverable());
        assert!(matches!(
            err,
            PipelineError::Contract(ContractViolation::MalformedModel { .. })
        ));
    }

    #[test]
    fn non_finite_prediction_is_an_inference_error() {
        let err = with_constant(f64::NAN).run_inference(&toyota_compact()).unwrap_err();
        assert_eq!(err.stage(), Stage::Inference);
        assert!(err.is_recoverable());
    }

    #[test]
    fn negative_prediction_is_clamped() {
        let result = with_constant(-12.0).run_inference(&toyota_compact()).unwrap();
        assert_eq!(result.value_grams_per_km, 0.0);
        assert_eq!(result.tier, EmissionTier::Low);
    }

    #[test]
    fn thresholds_apply_to_model_output() {
        let spec = toyota_compact();
        assert_eq!(with_constant(199.99).run_inference(&spec).unwrap().tier, EmissionTier::Low);
        assert_eq!(with_constant(200.0).run_inference(&spec).unwrap().tier, EmissionTier::Medium);
        assert_eq!(with_constant(300.0).run_inference(&spec).unwrap().tier, EmissionTier::High);
    }

    #[test]
    fn valid_specs_never_fail_and_are_non_negative() {
        let p = pipeline();
        let registry = sample_registry();
        let mut rng = StdRng::seed_from_u64(13);

        let pick = |rng: &mut StdRng, feature: Feature| -> String {
            registry
                .categories_for(feature)
                .choose(rng)
                .cloned()
                .unwrap()
        };

        for _ in 0..500 {
            let spec = VehicleSpec {
                make: pick(&mut rng, Feature::Make),
                vehicle_class: pick(&mut rng, Feature::VehicleClass),
                transmission: pick(&mut rng, Feature::Transmission),
                fuel_type_code: pick(&mut rng, Feature::FuelType),
                engine_size_liters: rng.gen_range(0.0..=10.0),
                cylinder_count: rng.gen_range(3..=16),
                fuel_combined: rng.gen_range(1.0..=50.0),
            };
            let result = p.run_inference(&spec).unwrap();
            assert!(result.value_grams_per_km >= 0.0);
            assert_eq!(result.tier, classify(result.value_grams_per_km));
        }
    }

    #[test]
    fn pipeline_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<InferencePipeline>();
    }
}
