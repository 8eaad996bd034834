//! Load the model and encoder artifacts.
//!
//! Both files are JSON, read once at startup:
//!
//! - model: `models::ModelArtifact` (feature names + tagged parameters)
//! - encoders: `{"Make": [...], "Vehicle Class": [...], "Transmission": [...], "Fuel Type": [...]}`
//!
//! Any failure here is fatal: the caller must not serve requests without a
//! complete, schema-compatible pair.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::app::pipeline::InferencePipeline;
use crate::encoders::EncoderRegistry;
use crate::models::{ContractViolation, ModelArtifact, ModelError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Model,
    Encoders,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Model => f.write_str("model"),
            ArtifactKind::Encoders => f.write_str("encoder bundle"),
        }
    }
}

/// Startup failure while loading an artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("{kind} artifact not found: {}", .path.display())]
    Missing { kind: ArtifactKind, path: PathBuf },

    #[error("failed to read {kind} artifact '{}': {source}", .path.display())]
    Unreadable {
        kind: ArtifactKind,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{kind} artifact '{}' is corrupt: {reason}", .path.display())]
    Corrupt {
        kind: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error("{kind} artifact '{}' is incompatible with feature assembly: {source}", .path.display())]
    Schema {
        kind: ArtifactKind,
        path: PathBuf,
        source: ContractViolation,
    },
}

/// Where to find the two artifacts.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub encoders: PathBuf,
}

/// Read and validate a model artifact.
pub fn load_model(path: &Path) -> Result<ModelArtifact, ArtifactError> {
    let text = read_artifact(ArtifactKind::Model, path)?;
    let model: ModelArtifact = serde_json::from_str(&text).map_err(|e| ArtifactError::Corrupt {
        kind: ArtifactKind::Model,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    model.validate().map_err(|e| match e {
        ModelError::Contract(source) => ArtifactError::Schema {
            kind: ArtifactKind::Model,
            path: path.to_path_buf(),
            source,
        },
        other => ArtifactError::Corrupt {
            kind: ArtifactKind::Model,
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    })?;

    info!(
        path = %path.display(),
        kind = model.kind_name(),
        trees = model.tree_count(),
        "loaded model artifact"
    );
    Ok(model)
}

/// Read an encoder bundle and build the registry.
pub fn load_encoders(path: &Path) -> Result<EncoderRegistry, ArtifactError> {
    let text = read_artifact(ArtifactKind::Encoders, path)?;
    let bundle: BTreeMap<String, Vec<String>> =
        serde_json::from_str(&text).map_err(|e| ArtifactError::Corrupt {
            kind: ArtifactKind::Encoders,
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let registry = EncoderRegistry::from_bundle(bundle).map_err(|e| ArtifactError::Corrupt {
        kind: ArtifactKind::Encoders,
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    for (feature, count) in registry.summary() {
        info!(feature = %feature, categories = count, "loaded encoder");
    }
    Ok(registry)
}

/// Load both artifacts and wire them into a pipeline.
///
/// The encoder bundle is loaded first so that a missing bundle is reported even
/// when the model is also missing (it is the smaller, more often forgotten file).
pub fn load_pipeline(paths: &ArtifactPaths) -> Result<InferencePipeline, ArtifactError> {
    let registry = load_encoders(&paths.encoders)?;
    let model = load_model(&paths.model)?;

    InferencePipeline::new(Arc::new(registry), Arc::new(model)).map_err(|source| {
        error!(error = %source, "artifacts disagree on the feature schema");
        ArtifactError::Schema {
            kind: ArtifactKind::Model,
            path: paths.model.clone(),
            source,
        }
    })
}

fn read_artifact(kind: ArtifactKind, path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            ArtifactError::Missing {
                kind,
                path: path.to_path_buf(),
            }
        } else {
            ArtifactError::Unreadable {
                kind,
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;

    use super::*;
    use crate::encoders::registry::tests::sample_bundle;
    use crate::features::assemble::tests::toyota_compact;
    use crate::models::model::tests::sample_model;

    fn write_json<T: serde::Serialize>(dir: &TempDir, name: &str, value: &T) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        serde_json::to_writer(&mut file, value).unwrap();
        file.flush().unwrap();
        path
    }

    fn write_raw(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn sample_paths(dir: &TempDir) -> ArtifactPaths {
        ArtifactPaths {
            model: write_json(dir, "model.json", &sample_model()),
            encoders: write_json(dir, "encoders.json", &sample_bundle()),
        }
    }

    #[test]
    fn loads_a_working_pipeline() {
        let dir = TempDir::new().unwrap();
        let pipeline = load_pipeline(&sample_paths(&dir)).unwrap();
        let result = pipeline.run_inference(&toyota_compact()).unwrap();
        assert_eq!(result.value_grams_per_km, 210.0);
    }

    #[test]
    fn missing_model_fails_before_any_pipeline_exists() {
        let dir = TempDir::new().unwrap();
        let mut paths = sample_paths(&dir);
        paths.model = dir.path().join("nope.json");
        match load_pipeline(&paths) {
            Err(ArtifactError::Missing { kind, path }) => {
                assert_eq!(kind, ArtifactKind::Model);
                assert_eq!(path, paths.model);
            }
            other => panic!("expected missing model, got {other:?}"),
        }
    }

    #[test]
    fn missing_encoders_fail() {
        let dir = TempDir::new().unwrap();
        let mut paths = sample_paths(&dir);
        paths.encoders = dir.path().join("nope.json");
        let err = load_pipeline(&paths).unwrap_err();
        assert!(matches!(
            err,
            ArtifactError::Missing {
                kind: ArtifactKind::Encoders,
                ..
            }
        ));
        assert!(err.to_string().starts_with("encoder bundle artifact not found"));
    }

    #[test]
    fn invalid_json_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let path = write_raw(&dir, "model.json", "{ not json");
        assert!(matches!(
            load_model(&path),
            Err(ArtifactError::Corrupt {
                kind: ArtifactKind::Model,
                ..
            })
        ));
    }

    #[test]
    fn encoder_bundle_without_fuel_type_is_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut bundle = sample_bundle();
        bundle.remove("Fuel Type");
        let path = write_json(&dir, "encoders.json", &bundle);
        let err = load_encoders(&path).unwrap_err();
        assert!(err.to_string().contains("Fuel Type"), "{err}");
    }

    #[test]
    fn reordered_model_schema_is_a_schema_error() {
        let dir = TempDir::new().unwrap();
        let mut model = sample_model();
        model.feature_names.reverse();
        let path = write_json(&dir, "model.json", &model);
        assert!(matches!(
            load_model(&path),
            Err(ArtifactError::Schema {
                source: ContractViolation::Schema { .. },
                ..
            })
        ));
    }

    #[test]
    fn bundled_demo_artifacts_load() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("artifacts");
        let pipeline = load_pipeline(&ArtifactPaths {
            model: root.join("co2_model.json"),
            encoders: root.join("label_encoders.json"),
        })
        .unwrap();
        let result = pipeline.run_inference(&toyota_compact()).unwrap();
        assert!(result.value_grams_per_km >= 0.0);
    }
}
