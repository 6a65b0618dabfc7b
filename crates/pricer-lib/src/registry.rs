//! Model registry: logical names, artifact locations, format dispatch
//!
//! The registry is a fixed table built at startup. Formats are derived
//! from artifact file extensions into a closed enum, so an unknown format
//! is rejected at construction, before any load attempt.

use crate::backend::{GradientBoostedTrees, NativeEstimator, OnnxModel, PriceModel};
use crate::error::{ArtifactError, PipelineError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Closed set of supported artifact formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactFormat {
    /// Bincode-serialized pre-fit estimator (`.est`).
    NativeEstimator,
    /// Exported network checkpoint served by tract (`.onnx`).
    NeuralCheckpoint,
    /// Bincode-serialized boosted trees (`.gbm`).
    GradientBoostingNative,
    /// JSON-serialized boosted trees (`.json`).
    GradientBoostingJson,
}

impl ArtifactFormat {
    /// Derive the format from an artifact's file extension.
    pub fn from_path(path: &Path) -> Result<Self, ArtifactError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("est") => Ok(ArtifactFormat::NativeEstimator),
            Some("onnx") => Ok(ArtifactFormat::NeuralCheckpoint),
            Some("gbm") => Ok(ArtifactFormat::GradientBoostingNative),
            Some("json") => Ok(ArtifactFormat::GradientBoostingJson),
            _ => Err(ArtifactError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactFormat::NativeEstimator => "native-estimator",
            ArtifactFormat::NeuralCheckpoint => "neural-checkpoint",
            ArtifactFormat::GradientBoostingNative => "gradient-boosting-native",
            ArtifactFormat::GradientBoostingJson => "gradient-boosting-json",
        }
    }
}

/// Registry entry for one model.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    /// Human label shown to users and used to select a model.
    pub logical_name: String,
    pub artifact_path: PathBuf,
    pub artifact_format: ArtifactFormat,
}

/// The deployment's standard model catalog: logical name and artifact
/// file name under the models directory.
pub const DEFAULT_CATALOG: [(&str, &str); 5] = [
    ("Neural Network (MLP)", "mlp.onnx"),
    ("Gradient Boosting", "gradient_boosting.gbm"),
    ("Gradient Boosting (JSON)", "gradient_boosting.json"),
    ("Bagging Regressor", "bagging_regressor.est"),
    ("Polynomial Regression", "polynomial_regression.est"),
];

/// Fixed table of configured models.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<ModelDescriptor>,
}

impl ModelRegistry {
    /// Build a registry from (logical name, artifact file name) pairs
    /// rooted at `models_dir`.
    pub fn from_catalog(
        models_dir: &Path,
        catalog: &[(&str, &str)],
    ) -> Result<Self, ArtifactError> {
        let mut models = Vec::with_capacity(catalog.len());
        for (logical_name, file_name) in catalog {
            let artifact_path = models_dir.join(file_name);
            let artifact_format = ArtifactFormat::from_path(&artifact_path)?;
            models.push(ModelDescriptor {
                logical_name: (*logical_name).to_string(),
                artifact_path,
                artifact_format,
            });
        }
        Ok(Self { models })
    }

    /// Build a registry with the standard catalog.
    pub fn with_default_catalog(models_dir: &Path) -> Result<Self, ArtifactError> {
        Self::from_catalog(models_dir, &DEFAULT_CATALOG)
    }

    /// Configured models whose artifact currently exists on storage.
    ///
    /// A configured model with no file reflects deployment state, not a
    /// programming error, so it is omitted rather than reported.
    pub fn list(&self) -> Vec<&ModelDescriptor> {
        self.models
            .iter()
            .filter(|descriptor| {
                let present = descriptor.artifact_path.exists();
                if !present {
                    debug!(
                        model = %descriptor.logical_name,
                        path = %descriptor.artifact_path.display(),
                        "artifact missing, omitting from listing"
                    );
                }
                present
            })
            .collect()
    }

    pub fn resolve(&self, logical_name: &str) -> Result<&ModelDescriptor, PipelineError> {
        self.models
            .iter()
            .find(|descriptor| descriptor.logical_name == logical_name)
            .ok_or_else(|| PipelineError::ModelNotFound {
                name: logical_name.to_string(),
            })
    }
}

/// Map a format to its deserialization routine. Exhaustive: adding a
/// format without a loader fails to compile.
pub fn loader_for(
    format: ArtifactFormat,
) -> fn(&Path) -> Result<Arc<dyn PriceModel>, ArtifactError> {
    match format {
        ArtifactFormat::NativeEstimator => {
            |path| Ok(Arc::new(NativeEstimator::load_bincode(path)?) as Arc<dyn PriceModel>)
        }
        ArtifactFormat::NeuralCheckpoint => {
            |path| Ok(Arc::new(OnnxModel::load(path)?) as Arc<dyn PriceModel>)
        }
        ArtifactFormat::GradientBoostingNative => |path| {
            let model = GradientBoostedTrees::load_bincode(path)?;
            Ok(Arc::new(NativeEstimator::GradientBoosting(model)) as Arc<dyn PriceModel>)
        },
        ArtifactFormat::GradientBoostingJson => |path| {
            let model = GradientBoostedTrees::load_json(path)?;
            Ok(Arc::new(NativeEstimator::GradientBoosting(model)) as Arc<dyn PriceModel>)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ArtifactFormat::from_path(Path::new("models/mlp.onnx")).unwrap(),
            ArtifactFormat::NeuralCheckpoint
        );
        assert_eq!(
            ArtifactFormat::from_path(Path::new("models/gb.gbm")).unwrap(),
            ArtifactFormat::GradientBoostingNative
        );
        assert_eq!(
            ArtifactFormat::from_path(Path::new("models/gb.json")).unwrap(),
            ArtifactFormat::GradientBoostingJson
        );
        assert_eq!(
            ArtifactFormat::from_path(Path::new("models/poly.est")).unwrap(),
            ArtifactFormat::NativeEstimator
        );
    }

    #[test]
    fn test_unknown_format_rejected_at_construction() {
        let dir = TempDir::new().unwrap();
        let result = ModelRegistry::from_catalog(dir.path(), &[("Legacy", "model.pkl")]);
        match result {
            Err(ArtifactError::UnsupportedFormat { path }) => {
                assert!(path.ends_with("model.pkl"))
            }
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_list_omits_missing_artifacts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("gradient_boosting.gbm"), b"x").unwrap();

        let registry = ModelRegistry::with_default_catalog(dir.path()).unwrap();
        let listed = registry.list();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].logical_name, "Gradient Boosting");
    }

    #[test]
    fn test_resolve_unknown_name() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::with_default_catalog(dir.path()).unwrap();
        assert!(matches!(
            registry.resolve("CatBoost"),
            Err(PipelineError::ModelNotFound { .. })
        ));
        assert!(registry.resolve("Gradient Boosting").is_ok());
    }
}
