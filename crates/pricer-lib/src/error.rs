//! Error types for the serving pipeline
//!
//! Each stage of the pipeline fails with its own error type so callers can
//! tell user-correctable input problems apart from operator-correctable
//! artifact problems. All variants name the concrete field, path, or shape
//! involved.

use std::path::PathBuf;
use thiserror::Error;

/// Input record failed the feature contract. User-correctable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    #[error("missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` is not numeric: `{value}`")]
    InvalidNumber { field: &'static str, value: String },

    #[error("field `{field}` value {value} is outside the valid range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("field `{field}` has unknown category `{value}` (expected one of: {expected})")]
    UnknownCategory {
        field: &'static str,
        value: String,
        expected: String,
    },
}

/// A model or preprocessor artifact could not be used. Operator-correctable.
///
/// Cloneable so a failed load can be memoized by the cache and surfaced on
/// every subsequent request without retrying the I/O.
#[derive(Debug, Clone, Error)]
pub enum ArtifactError {
    #[error("artifact not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("artifact {} is corrupt: {detail}", .path.display())]
    Corrupt { path: PathBuf, detail: String },

    #[error("unsupported artifact format: {}", .path.display())]
    UnsupportedFormat { path: PathBuf },
}

/// Live input does not match what the fitted transformation expects.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("column `{column}` value `{value}` is outside the fitted vocabulary")]
    UnknownCategory { column: &'static str, value: String },
}

/// Top-level pipeline error, identifying the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input validation failed: {0}")]
    Feature(#[from] FeatureError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("preprocessing failed: {0}")]
    Transform(#[from] TransformError),

    #[error("no model registered under `{name}`")]
    ModelNotFound { name: String },

    #[error("inference failed: {detail}")]
    Inference { detail: String },

    #[error("unexpected model output shape {rows}x{cols}")]
    UnexpectedOutputShape { rows: usize, cols: usize },

    #[error("batch of {rows} rows exceeds the configured limit of {max}")]
    BatchTooLarge { rows: usize, max: usize },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
