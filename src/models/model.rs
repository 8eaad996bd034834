//! Model evaluation for gradient-boosted trees and linear regressors.
//!
//! The pipeline relies on one primitive operation: predict a scalar from an
//! ordered feature vector. The artifact is validated once at load time, but
//! evaluation still bounds-checks every index so an artifact that skipped
//! validation yields a `ContractViolation` instead of a panic.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{FEATURE_COUNT, FEATURE_NAMES, FeatureVector};

/// Feature schema disagreement between feature assembly and the model.
///
/// Every request would fail the same way, so callers treat this as a
/// deployment fault rather than a user error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("feature vector has {actual} elements, model expects {expected}")]
    Shape { expected: usize, actual: usize },

    #[error("model feature names {found:?} do not match expected order {expected:?}")]
    Schema {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("encoder registry is missing categorical features")]
    IncompleteRegistry,

    #[error("model parameters do not fit the feature vector: {reason}")]
    MalformedModel { reason: String },
}

/// Structural problems found while validating a model artifact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error(transparent)]
    Contract(#[from] ContractViolation),

    #[error("tree {tree}: {reason}")]
    MalformedTree { tree: usize, reason: String },

    #[error("{0}")]
    Malformed(String),
}

/// Anything that maps an ordered feature vector to a CO2 estimate.
///
/// Implemented by [`ModelArtifact`]; tests substitute fakes.
pub trait Regressor: Send + Sync {
    /// Number of features the model was trained with.
    fn feature_count(&self) -> usize;

    /// Predict g/km CO2 for `features`.
    fn predict(&self, features: &FeatureVector) -> Result<f64, ContractViolation>;
}

/// A serialized model file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Free-form producer tag (e.g. the export script name).
    #[serde(default)]
    pub tool: Option<String>,
    /// Feature names in training order; must equal [`FEATURE_NAMES`].
    pub feature_names: Vec<String>,
    pub model: ModelParams,
}

/// Model parameters, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelParams {
    /// Gradient-boosted regression trees: `base_score + Σ tree(x)`.
    Gbtree { base_score: f64, trees: Vec<Tree> },
    /// `intercept + Σ coefficients[i] * x[i]`.
    Linear { intercept: f64, coefficients: Vec<f64> },
}

/// A single regression tree stored as a node array rooted at index 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeNode {
    /// Go to `left` when `x[feature] < threshold`, else to `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf { value: f64 },
}

impl ModelArtifact {
    /// Short label for logs and terminal output.
    pub fn kind_name(&self) -> &'static str {
        match self.model {
            ModelParams::Gbtree { .. } => "gbtree",
            ModelParams::Linear { .. } => "linear",
        }
    }

    /// Number of trees (0 for linear models).
    pub fn tree_count(&self) -> usize {
        match &self.model {
            ModelParams::Gbtree { trees, .. } => trees.len(),
            ModelParams::Linear { .. } => 0,
        }
    }

    /// Check the feature schema and the internal structure of the parameters.
    ///
    /// Split children must point forward in the node array, which rules out
    /// cycles and guarantees traversal terminates.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.feature_names.len() != FEATURE_COUNT
            || self.feature_names.iter().zip(FEATURE_NAMES).any(|(a, b)| a != b)
        {
            return Err(ContractViolation::Schema {
                expected: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
                found: self.feature_names.clone(),
            }
            .into());
        }

        let n_features = self.feature_names.len();
        match &self.model {
            ModelParams::Gbtree { base_score, trees } => {
                if !base_score.is_finite() {
                    return Err(ModelError::Malformed("base_score is not finite".to_string()));
                }
                for (idx, tree) in trees.iter().enumerate() {
                    validate_tree(tree, n_features).map_err(|reason| ModelError::MalformedTree {
                        tree: idx,
                        reason,
                    })?;
                }
            }
            ModelParams::Linear {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != n_features {
                    return Err(ModelError::Malformed(format!(
                        "linear model has {} coefficients, expected {n_features}",
                        coefficients.len()
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(ModelError::Malformed(
                        "linear model has non-finite parameters".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl Regressor for ModelArtifact {
    fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    fn predict(&self, features: &FeatureVector) -> Result<f64, ContractViolation> {
        if features.len() != self.feature_count() {
            return Err(ContractViolation::Shape {
                expected: self.feature_count(),
                actual: features.len(),
            });
        }

        let x = features.as_slice();
        let y = match &self.model {
            ModelParams::Gbtree { base_score, trees } => {
                let mut sum = *base_score;
                for (idx, tree) in trees.iter().enumerate() {
                    sum += eval_tree(tree, x)
                        .map_err(|reason| ContractViolation::MalformedModel {
                            reason: format!("tree {idx}: {reason}"),
                        })?;
                }
                sum
            }
            ModelParams::Linear {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != x.len() {
                    return Err(ContractViolation::MalformedModel {
                        reason: format!(
                            "linear model has {} coefficients for {} features",
                            coefficients.len(),
                            x.len()
                        ),
                    });
                }
                intercept + coefficients.iter().zip(x).map(|(c, v)| c * v).sum::<f64>()
            }
        };
        Ok(y)
    }
}

fn validate_tree(tree: &Tree, n_features: usize) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("tree has no nodes".to_string());
    }
    let n = tree.nodes.len();
    for (idx, node) in tree.nodes.iter().enumerate() {
        match *node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if feature >= n_features {
                    return Err(format!("node {idx} splits on feature {feature} (have {n_features})"));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {idx} has a non-finite threshold"));
                }
                for child in [left, right] {
                    if child <= idx || child >= n {
                        return Err(format!("node {idx} has invalid child index {child}"));
                    }
                }
            }
            TreeNode::Leaf { value } => {
                if !value.is_finite() {
                    return Err(format!("leaf {idx} has a non-finite value"));
                }
            }
        }
    }
    Ok(())
}

/// Walk one tree from the root to a leaf.
///
/// A path can visit at most `nodes.len()` nodes; anything longer is a cycle.
fn eval_tree(tree: &Tree, x: &[f64]) -> Result<f64, String> {
    let mut idx = 0usize;
    for _ in 0..tree.nodes.len() {
        match tree.nodes.get(idx) {
            Some(TreeNode::Leaf { value }) => return Ok(*value),
            Some(TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            }) => {
                let Some(&value) = x.get(*feature) else {
                    return Err(format!("node {idx} splits on feature {feature} (have {})", x.len()));
                };
                idx = if value < *threshold { *left } else { *right };
            }
            None => return Err(format!("node index {idx} is out of range")),
        }
    }
    Err("traversal did not reach a leaf".to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn names() -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    fn split(feature: usize, threshold: f64, left: usize, right: usize) -> TreeNode {
        TreeNode::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    fn leaf(value: f64) -> TreeNode {
        TreeNode::Leaf { value }
    }

    /// Two-tree ensemble keyed on fuel consumption and fuel type.
    pub(crate) fn sample_model() -> ModelArtifact {
        ModelArtifact {
            tool: Some("test".to_string()),
            feature_names: names(),
            model: ModelParams::Gbtree {
                base_score: 100.0,
                trees: vec![
                    Tree {
                        nodes: vec![
                            split(6, 8.0, 1, 2),
                            leaf(20.0),
                            split(6, 12.0, 3, 4),
                            leaf(110.0),
                            leaf(240.0),
                        ],
                    },
                    Tree {
                        nodes: vec![split(3, 0.5, 1, 2), leaf(25.0), leaf(0.0)],
                    },
                ],
            },
        }
    }

    fn vector(fuel_code: f64, fuel_comb: f64) -> FeatureVector {
        FeatureVector::from_values(vec![0.0, 0.0, 0.0, fuel_code, 2.0, 4.0, fuel_comb])
    }

    #[test]
    fn gbtree_sums_base_score_and_leaves() {
        let model = sample_model();
        model.validate().unwrap();
        assert_eq!(model.predict(&vector(4.0, 6.0)).unwrap(), 120.0);
        assert_eq!(model.predict(&vector(4.0, 8.5)).unwrap(), 210.0);
        assert_eq!(model.predict(&vector(0.0, 15.0)).unwrap(), 365.0);
    }

    #[test]
    fn split_threshold_routes_equal_values_right() {
        let model = sample_model();
        assert_eq!(model.predict(&vector(4.0, 8.0)).unwrap(), 210.0);
    }

    #[test]
    fn linear_model_is_a_dot_product() {
        let model = ModelArtifact {
            tool: None,
            feature_names: names(),
            model: ModelParams::Linear {
                intercept: 10.0,
                coefficients: vec![0.0, 0.0, 0.0, 0.0, 5.0, 2.0, 20.0],
            },
        };
        model.validate().unwrap();
        let y = model.predict(&vector(0.0, 8.0)).unwrap();
        assert!((y - (10.0 + 10.0 + 8.0 + 160.0)).abs() < 1e-9);
    }

    #[test]
    fn wrong_shape_is_a_contract_violation() {
        let model = sample_model();
        let err = model
            .predict(&FeatureVector::from_values(vec![1.0, 2.0, 3.0]))
            .unwrap_err();
        assert_eq!(err, ContractViolation::Shape { expected: 7, actual: 3 });
    }

    #[test]
    fn reordered_feature_names_fail_validation() {
        let mut model = sample_model();
        model.feature_names.swap(4, 6);
        assert!(matches!(
            model.validate(),
            Err(ModelError::Contract(ContractViolation::Schema { .. }))
        ));
    }

    #[test]
    fn backward_child_pointer_is_malformed() {
        let mut model = sample_model();
        if let ModelParams::Gbtree { trees, .. } = &mut model.model {
            trees[1].nodes[0] = split(3, 0.5, 0, 2);
        }
        assert!(matches!(
            model.validate(),
            Err(ModelError::MalformedTree { tree: 1, .. })
        ));
    }

    #[test]
    fn out_of_range_split_feature_is_malformed() {
        let mut model = sample_model();
        if let ModelParams::Gbtree { trees, .. } = &mut model.model {
            trees[0].nodes[0] = split(7, 8.0, 1, 2);
        }
        assert!(matches!(
            model.validate(),
            Err(ModelError::MalformedTree { tree: 0, .. })
        ));
    }

    #[test]
    fn unvalidated_out_of_range_feature_is_a_contract_violation() {
        let mut model = sample_model();
        if let ModelParams::Gbtree { trees, .. } = &mut model.model {
            trees[0].nodes[0] = split(9, 8.0, 1, 2);
        }
        let err = model.predict(&vector(4.0, 8.5)).unwrap_err();
        assert!(matches!(err, ContractViolation::MalformedModel { .. }));
        assert!(err.to_string().contains("feature 9"), "{err}");
    }

    #[test]
    fn unvalidated_dangling_child_and_cycle_do_not_panic() {
        let mut model = sample_model();
        if let ModelParams::Gbtree { trees, .. } = &mut model.model {
            trees[1].nodes[0] = split(3, 0.5, 7, 2);
        }
        assert!(matches!(
            model.predict(&vector(0.0, 8.5)),
            Err(ContractViolation::MalformedModel { .. })
        ));

        let mut model = sample_model();
        if let ModelParams::Gbtree { trees, .. } = &mut model.model {
            trees[1].nodes[0] = split(3, 0.5, 0, 0);
        }
        assert!(matches!(
            model.predict(&vector(0.0, 8.5)),
            Err(ContractViolation::MalformedModel { .. })
        ));
    }

    #[test]
    fn unvalidated_linear_width_mismatch_is_a_contract_violation() {
        let model = ModelArtifact {
            tool: None,
            feature_names: names(),
            model: ModelParams::Linear {
                intercept: 1.0,
                coefficients: vec![1.0; 3],
            },
        };
        assert!(matches!(
            model.predict(&vector(0.0, 8.0)),
            Err(ContractViolation::MalformedModel { .. })
        ));
    }

    #[test]
    fn parses_tagged_json() {
        let json = r#"{
            "feature_names": ["Make", "Vehicle Class", "Transmission", "Fuel Type",
                              "Engine Size(L)", "Cylinders", "Fuel Consumption Comb (L/100 km)"],
            "model": {
                "kind": "gbtree",
                "base_score": 50.0,
                "trees": [{"nodes": [
                    {"split": {"feature": 6, "threshold": 10.0, "left": 1, "right": 2}},
                    {"leaf": {"value": 100.0}},
                    {"leaf": {"value": 250.0}}
                ]}]
            }
        }"#;
        let model: ModelArtifact = serde_json::from_str(json).unwrap();
        model.validate().unwrap();
        assert_eq!(model.kind_name(), "gbtree");
        assert_eq!(model.tree_count(), 1);
        assert_eq!(model.predict(&vector(3.0, 9.0)).unwrap(), 150.0);
    }
}
