//! Pre-fit model backends behind a single predict capability
//!
//! Each artifact format has one loader producing a [`PriceModel`]; the
//! pipeline never needs to know which backend it is talking to.

mod estimator;
mod onnx;

pub use estimator::{
    BaggingEnsemble, GradientBoostedTrees, NativeEstimator, PolynomialRegressor, RegressionTree,
    TreeNode,
};
pub use onnx::OnnxModel;

use crate::error::PipelineError;
use ndarray::Array2;

/// Number of input features every backend expects per record.
pub const NUM_FEATURES: usize = crate::contract::FEATURE_COLUMNS.len();

/// Capability contract shared by every backend: one preprocessed feature
/// matrix in, one raw prediction matrix out. Output shape is normalized
/// downstream.
pub trait PriceModel: Send + Sync {
    fn predict(&self, features: &Array2<f32>) -> Result<Array2<f32>, PipelineError>;
}

pub(crate) fn check_feature_width(features: &Array2<f32>) -> Result<(), PipelineError> {
    let cols = features.ncols();
    if cols != NUM_FEATURES {
        return Err(PipelineError::Inference {
            detail: format!("expected {} feature columns, got {}", NUM_FEATURES, cols),
        });
    }
    Ok(())
}
