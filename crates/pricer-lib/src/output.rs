//! Output normalization
//!
//! Backends return raw predictions in whatever shape their format
//! produces: a 1x1 matrix, a column per record, or a single row. The
//! normalizer reconciles them into the canonical contract of one finite
//! price per input record, and refuses shapes it cannot account for
//! instead of guessing.

use crate::error::{PipelineError, PipelineResult};
use ndarray::Array2;
use tracing::warn;

/// Normalizer policy knobs.
#[derive(Debug, Clone, Default)]
pub struct NormalizerConfig {
    /// Degrade an unexpected single-record output shape to its first
    /// element (with a logged warning) instead of failing. Off by
    /// default; exists only for parity with legacy deployments that
    /// relied on this behavior.
    pub first_element_fallback: bool,
}

/// Reconciles backend output shapes into canonical prices.
#[derive(Debug, Clone, Default)]
pub struct OutputNormalizer {
    config: NormalizerConfig,
}

impl OutputNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Normalize a single-record output to one scalar price.
    pub fn scalar(&self, output: &Array2<f32>) -> PipelineResult<f32> {
        let (rows, cols) = output.dim();
        if rows == 1 && cols == 1 {
            return finite(output[[0, 0]]);
        }
        if self.config.first_element_fallback {
            if let Some(first) = output.iter().copied().next() {
                warn!(rows, cols, "unexpected prediction shape, degrading to first element");
                return finite(first);
            }
        }
        Err(PipelineError::UnexpectedOutputShape { rows, cols })
    }

    /// Normalize a batch output to one price per input record, in input
    /// order. Accepts a column vector or a single row of matching length.
    pub fn series(&self, output: &Array2<f32>, expected_rows: usize) -> PipelineResult<Vec<f32>> {
        let (rows, cols) = output.dim();
        let values: Vec<f32> = if cols == 1 && rows == expected_rows {
            output.column(0).iter().copied().collect()
        } else if rows == 1 && cols == expected_rows {
            output.row(0).iter().copied().collect()
        } else {
            return Err(PipelineError::UnexpectedOutputShape { rows, cols });
        };

        for value in &values {
            finite(*value)?;
        }
        Ok(values)
    }
}

fn finite(value: f32) -> PipelineResult<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(PipelineError::Inference {
            detail: format!("model produced a non-finite prediction: {}", value),
        })
    }
}
