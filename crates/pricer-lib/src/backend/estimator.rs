//! Serde-defined pre-fit estimators
//!
//! Covers the artifact families that serialize as plain data rather than a
//! compute graph: regression-tree ensembles (bagging, gradient boosting)
//! and polynomial regression. The native format is bincode; the gradient
//! boosting JSON format carries the same structure as serde_json.

use super::{check_feature_width, PriceModel, NUM_FEATURES};
use crate::error::{ArtifactError, PipelineError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// One node of a regression tree. Children are indices into the tree's
/// node array and must come after their parent, so a walk always
/// terminates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f32,
    },
}

/// A fitted regression tree, node 0 as root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Structural checks a fitted artifact must satisfy before use.
    fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= NUM_FEATURES {
                    return Err(format!(
                        "node {} splits on feature {}, contract has {}",
                        index, feature, NUM_FEATURES
                    ));
                }
                if *left >= self.nodes.len() || *right >= self.nodes.len() {
                    return Err(format!("node {} has out-of-bounds child", index));
                }
                if *left <= index || *right <= index {
                    return Err(format!("node {} has a backward child reference", index));
                }
            }
        }
        Ok(())
    }

    fn score(&self, row: &[f32]) -> f32 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Gradient-boosted regression trees: base score plus shrunken tree sum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub base_score: f32,
    pub learning_rate: f32,
    pub trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("boosted ensemble has no trees".to_string());
        }
        if !self.learning_rate.is_finite() || self.learning_rate <= 0.0 {
            return Err(format!("invalid learning rate {}", self.learning_rate));
        }
        for tree in &self.trees {
            tree.validate()?;
        }
        Ok(())
    }

    fn score(&self, row: &[f32]) -> f32 {
        let boosted: f32 = self.trees.iter().map(|tree| tree.score(row)).sum();
        self.base_score + self.learning_rate * boosted
    }

    /// Deserialize from the native binary artifact format.
    pub fn load_bincode(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = read_artifact(path)?;
        let model: Self = bincode::deserialize(&bytes).map_err(|e| corrupt(path, e.to_string()))?;
        model.validate().map_err(|detail| corrupt(path, detail))?;
        info!(path = %path.display(), trees = model.trees.len(), "boosted trees artifact loaded");
        Ok(model)
    }

    /// Deserialize from the JSON artifact format.
    pub fn load_json(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = read_artifact(path)?;
        let model: Self =
            serde_json::from_slice(&bytes).map_err(|e| corrupt(path, e.to_string()))?;
        model.validate().map_err(|detail| corrupt(path, detail))?;
        info!(path = %path.display(), trees = model.trees.len(), "boosted trees artifact loaded");
        Ok(model)
    }
}

/// Bagging ensemble: unweighted mean over independently fitted trees.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaggingEnsemble {
    pub estimators: Vec<RegressionTree>,
}

impl BaggingEnsemble {
    fn validate(&self) -> Result<(), String> {
        if self.estimators.is_empty() {
            return Err("bagging ensemble has no estimators".to_string());
        }
        for tree in &self.estimators {
            tree.validate()?;
        }
        Ok(())
    }

    fn score(&self, row: &[f32]) -> f32 {
        let total: f32 = self.estimators.iter().map(|tree| tree.score(row)).sum();
        total / self.estimators.len() as f32
    }
}

/// Polynomial regression over the contract features: for each feature j
/// and power p in 1..=degree, the term `coefficients[j * degree + p - 1]
/// * x_j^p`, plus the intercept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolynomialRegressor {
    pub degree: usize,
    pub coefficients: Vec<f32>,
    pub intercept: f32,
}

impl PolynomialRegressor {
    fn validate(&self) -> Result<(), String> {
        if self.degree == 0 {
            return Err("polynomial degree must be at least 1".to_string());
        }
        let expected = self.degree * NUM_FEATURES;
        if self.coefficients.len() != expected {
            return Err(format!(
                "expected {} coefficients for degree {}, got {}",
                expected,
                self.degree,
                self.coefficients.len()
            ));
        }
        Ok(())
    }

    fn score(&self, row: &[f32]) -> f32 {
        let mut total = self.intercept;
        for (j, &value) in row.iter().enumerate() {
            let mut power = 1.0f32;
            for p in 0..self.degree {
                power *= value;
                total += self.coefficients[j * self.degree + p] * power;
            }
        }
        total
    }
}

/// A pre-fit estimator in the native serialized format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NativeEstimator {
    Polynomial(PolynomialRegressor),
    Bagging(BaggingEnsemble),
    GradientBoosting(GradientBoostedTrees),
}

impl NativeEstimator {
    fn validate(&self) -> Result<(), String> {
        match self {
            NativeEstimator::Polynomial(model) => model.validate(),
            NativeEstimator::Bagging(model) => model.validate(),
            NativeEstimator::GradientBoosting(model) => model.validate(),
        }
    }

    fn score(&self, row: &[f32]) -> f32 {
        match self {
            NativeEstimator::Polynomial(model) => model.score(row),
            NativeEstimator::Bagging(model) => model.score(row),
            NativeEstimator::GradientBoosting(model) => model.score(row),
        }
    }

    /// Deserialize from the native binary artifact format.
    pub fn load_bincode(path: &Path) -> Result<Self, ArtifactError> {
        let bytes = read_artifact(path)?;
        let model: Self = bincode::deserialize(&bytes).map_err(|e| corrupt(path, e.to_string()))?;
        model.validate().map_err(|detail| corrupt(path, detail))?;
        info!(path = %path.display(), "native estimator artifact loaded");
        Ok(model)
    }
}

impl PriceModel for NativeEstimator {
    fn predict(&self, features: &Array2<f32>) -> Result<Array2<f32>, PipelineError> {
        check_feature_width(features)?;
        let scores: Vec<f32> = features
            .rows()
            .into_iter()
            .map(|row| self.score(row.as_slice().expect("feature rows are contiguous")))
            .collect();
        Ok(Array2::from_shape_vec((features.nrows(), 1), scores)
            .expect("one score per input row"))
    }
}

fn read_artifact(path: &Path) -> Result<Vec<u8>, ArtifactError> {
    if !path.exists() {
        return Err(ArtifactError::NotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read(path).map_err(|e| corrupt(path, e.to_string()))
}

fn corrupt(path: &Path, detail: String) -> ArtifactError {
    ArtifactError::Corrupt {
        path: path.to_path_buf(),
        detail,
    }
}
