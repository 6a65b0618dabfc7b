//! Neural-network checkpoint inference using tract
//!
//! Serves exported network checkpoints via tract-onnx. The plan is built
//! for single-record input; batches run row by row through the same plan.

use super::{check_feature_width, PriceModel, NUM_FEATURES};
use crate::error::{ArtifactError, PipelineError};
use ndarray::Array2;
use std::path::Path;
use tract_onnx::prelude::*;
use tracing::info;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A loaded, optimized network checkpoint.
pub struct OnnxModel {
    plan: TractModel,
}

impl OnnxModel {
    /// Load and optimize a checkpoint from storage.
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

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| corrupt(e.to_string()))?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .map_err(|e| corrupt(e.to_string()))?
            .into_optimized()
            .map_err(|e| corrupt(e.to_string()))?
            .into_runnable()
            .map_err(|e| corrupt(e.to_string()))?;

        info!(path = %path.display(), "network checkpoint loaded");
        Ok(Self { plan })
    }

    fn run_row(&self, row: &[f32]) -> Result<Vec<f32>, PipelineError> {
        let inference = |detail: String| PipelineError::Inference { detail };

        let input: Tensor = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), row.to_vec())
            .expect("row width matches input fact")
            .into();
        let outputs = self
            .plan
            .run(tvec!(input.into()))
            .map_err(|e| inference(e.to_string()))?;
        let output = outputs
            .first()
            .ok_or_else(|| inference("checkpoint produced no output".to_string()))?;
        let view = output
            .to_array_view::<f32>()
            .map_err(|e| inference(e.to_string()))?;
        Ok(view.iter().copied().collect())
    }
}

impl PriceModel for OnnxModel {
    fn predict(&self, features: &Array2<f32>) -> Result<Array2<f32>, PipelineError> {
        check_feature_width(features)?;
        if features.nrows() == 0 {
            return Ok(Array2::zeros((0, 1)));
        }

        let mut values: Vec<f32> = Vec::new();
        let mut width: Option<usize> = None;
        for row in features.rows() {
            let row_values = self.run_row(&row.to_vec())?;
            match width {
                None => width = Some(row_values.len()),
                Some(expected) if expected != row_values.len() => {
                    return Err(PipelineError::Inference {
                        detail: format!(
                            "inconsistent output width: {} then {}",
                            expected,
                            row_values.len()
                        ),
                    });
                }
                Some(_) => {}
            }
            values.extend(row_values);
        }

        let width = width.unwrap_or(0);
        if width == 0 {
            return Err(PipelineError::Inference {
                detail: "checkpoint produced empty output".to_string(),
            });
        }

        Ok(Array2::from_shape_vec((features.nrows(), width), values)
            .expect("uniform output width per row"))
    }
}
