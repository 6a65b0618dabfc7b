//! Fitted preprocessing adapter
//!
//! Wraps the encoding and scaling transformation that was fitted offline
//! alongside the models: ordinal encoding for the categorical columns,
//! then per-column standardization. The transform is pure; the same
//! records always produce the same matrix.

use crate::contract::{Clarity, Color, Cut, FeatureRecord, FEATURE_COLUMNS};
use crate::error::{ArtifactError, TransformError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Standardization parameters for one fitted column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedColumn {
    pub name: String,
    pub mean: f32,
    pub scale: f32,
}

/// On-disk preprocessing artifact shared by every model fitted against the
/// feature contract: ordinal vocabularies (index = code) for the three
/// categorical columns plus standardization parameters for all nine
/// columns, in fitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessorArtifact {
    pub columns: Vec<FittedColumn>,
    pub cut_vocabulary: Vec<String>,
    pub color_vocabulary: Vec<String>,
    pub clarity_vocabulary: Vec<String>,
}

impl PreprocessorArtifact {
    /// Identity-scale artifact whose vocabularies are the contract's own
    /// ordinal tables. Matches deployments whose models consume raw
    /// ordinal codes without rescaling.
    pub fn contract_default() -> Self {
        Self {
            columns: FEATURE_COLUMNS
                .iter()
                .map(|name| FittedColumn {
                    name: (*name).to_string(),
                    mean: 0.0,
                    scale: 1.0,
                })
                .collect(),
            cut_vocabulary: Cut::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            color_vocabulary: Color::ALL.iter().map(|c| c.as_str().to_string()).collect(),
            clarity_vocabulary: Clarity::ALL
                .iter()
                .map(|c| c.as_str().to_string())
                .collect(),
        }
    }
}

/// A loaded, ready-to-transform preprocessing adapter.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    artifact: PreprocessorArtifact,
}

impl Preprocessor {
    /// Deserialize a fitted preprocessing artifact from storage.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        if !path.exists() {
            return Err(ArtifactError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let corrupt = |detail: String| ArtifactError::Corrupt {
            path: path.to_path_buf(),
            detail,
        };

        let text = fs::read_to_string(path).map_err(|e| corrupt(e.to_string()))?;
        let artifact: PreprocessorArtifact =
            serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;

        let fitted: Vec<&str> = artifact.columns.iter().map(|c| c.name.as_str()).collect();
        if fitted != FEATURE_COLUMNS {
            return Err(corrupt(format!(
                "fitted column order {:?} does not match the feature contract {:?}",
                fitted, FEATURE_COLUMNS
            )));
        }
        if let Some(column) = artifact.columns.iter().find(|c| c.scale == 0.0) {
            return Err(corrupt(format!("degenerate scale for column `{}`", column.name)));
        }
        if artifact.cut_vocabulary.is_empty()
            || artifact.color_vocabulary.is_empty()
            || artifact.clarity_vocabulary.is_empty()
        {
            return Err(corrupt("empty categorical vocabulary".to_string()));
        }

        info!(path = %path.display(), "preprocessing artifact loaded");
        Ok(Self { artifact })
    }

    /// Number of feature columns produced per record.
    pub fn width(&self) -> usize {
        self.artifact.columns.len()
    }

    /// Apply the fitted encoding and scaling to validated records.
    ///
    /// A categorical value outside the *fitted* vocabulary fails even if
    /// the contract accepted it; the fitted artifact is the authority on
    /// what the models were trained to see.
    pub fn transform(&self, records: &[FeatureRecord]) -> Result<Array2<f32>, TransformError> {
        let width = self.width();
        let mut data = Vec::with_capacity(records.len() * width);
        for record in records {
            let row = [
                record.carat,
                encode("cut", &self.artifact.cut_vocabulary, record.cut.as_str())?,
                encode("color", &self.artifact.color_vocabulary, record.color.as_str())?,
                encode(
                    "clarity",
                    &self.artifact.clarity_vocabulary,
                    record.clarity.as_str(),
                )?,
                record.depth,
                record.table,
                record.x,
                record.y,
                record.z,
            ];
            for (value, column) in row.iter().zip(&self.artifact.columns) {
                data.push((value - column.mean) / column.scale);
            }
        }

        Ok(Array2::from_shape_vec((records.len(), width), data)
            .expect("row width matches fitted column count"))
    }
}

fn encode(column: &'static str, vocabulary: &[String], label: &str) -> Result<f32, TransformError> {
    vocabulary
        .iter()
        .position(|entry| entry == label)
        .map(|code| code as f32)
        .ok_or_else(|| TransformError::UnknownCategory {
            column,
            value: label.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Clarity, Color, Cut};
    use tempfile::TempDir;

    fn record() -> FeatureRecord {
        FeatureRecord {
            carat: 0.7,
            cut: Cut::Ideal,
            color: Color::G,
            clarity: Clarity::VS2,
            depth: 61.5,
            table: 57.0,
            x: 5.7,
            y: 5.7,
            z: 3.5,
        }
    }

    fn write_artifact(dir: &TempDir, artifact: &PreprocessorArtifact) -> std::path::PathBuf {
        let path = dir.path().join("preprocessor.json");
        fs::write(&path, serde_json::to_string(artifact).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_load_missing_artifact_names_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preprocessor.json");
        match Preprocessor::load(&path) {
            Err(ArtifactError::NotFound { path: reported }) => assert_eq!(reported, path),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preprocessor.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            Preprocessor::load(&path),
            Err(ArtifactError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_load_rejects_reordered_columns() {
        let dir = TempDir::new().unwrap();
        let mut artifact = PreprocessorArtifact::contract_default();
        artifact.columns.swap(0, 1);
        let path = write_artifact(&dir, &artifact);
        match Preprocessor::load(&path) {
            Err(ArtifactError::Corrupt { detail, .. }) => {
                assert!(detail.contains("column order"), "detail: {}", detail)
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_degenerate_scale() {
        let dir = TempDir::new().unwrap();
        let mut artifact = PreprocessorArtifact::contract_default();
        artifact.columns[4].scale = 0.0;
        let path = write_artifact(&dir, &artifact);
        match Preprocessor::load(&path) {
            Err(ArtifactError::Corrupt { detail, .. }) => {
                assert!(detail.contains("depth"), "detail: {}", detail)
            }
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let path = write_artifact(&dir, &PreprocessorArtifact::contract_default());
        let preprocessor = Preprocessor::load(&path).unwrap();

        let records = [record(), record()];
        let first = preprocessor.transform(&records).unwrap();
        let second = preprocessor.transform(&records).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_transform_encodes_and_scales() {
        let dir = TempDir::new().unwrap();
        let mut artifact = PreprocessorArtifact::contract_default();
        // carat standardized, categoricals left as ordinal codes
        artifact.columns[0].mean = 0.8;
        artifact.columns[0].scale = 0.4;
        let path = write_artifact(&dir, &artifact);
        let preprocessor = Preprocessor::load(&path).unwrap();

        let matrix = preprocessor.transform(&[record()]).unwrap();
        assert_eq!(matrix.dim(), (1, 9));
        assert!((matrix[[0, 0]] - (0.7 - 0.8) / 0.4).abs() < 1e-6);
        assert_eq!(matrix[[0, 1]], Cut::Ideal.code() as f32);
        assert_eq!(matrix[[0, 2]], Color::G.code() as f32);
        assert_eq!(matrix[[0, 3]], Clarity::VS2.code() as f32);
        assert_eq!(matrix[[0, 4]], 61.5);
    }

    #[test]
    fn test_transform_rejects_value_outside_fitted_vocabulary() {
        let dir = TempDir::new().unwrap();
        let mut artifact = PreprocessorArtifact::contract_default();
        // Fitted before "Ideal" existed in the data.
        artifact.cut_vocabulary.retain(|v| v != "Ideal");
        let path = write_artifact(&dir, &artifact);
        let preprocessor = Preprocessor::load(&path).unwrap();

        match preprocessor.transform(&[record()]) {
            Err(TransformError::UnknownCategory { column, value }) => {
                assert_eq!(column, "cut");
                assert_eq!(value, "Ideal");
            }
            other => panic!("expected UnknownCategory, got {:?}", other),
        }
    }
}
