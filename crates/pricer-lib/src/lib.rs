//! Serving library for diamond price prediction
//!
//! This crate provides the core functionality for:
//! - Feature contract validation for single records and tables
//! - Fitted preprocessing (ordinal encoding + scaling)
//! - Model registry with per-format artifact loaders
//! - Process-lifetime model caching
//! - Single-record and batch inference with output normalization
//! - Serving metrics

pub mod backend;
pub mod cache;
pub mod contract;
pub mod error;
pub mod models;
pub mod observability;
pub mod output;
pub mod pipeline;
pub mod preprocess;
pub mod registry;

pub use cache::{CacheStats, ModelCache};
pub use contract::{Clarity, Color, Cut, FeatureRecord, FEATURE_COLUMNS};
pub use error::{ArtifactError, FeatureError, PipelineError, PipelineResult, TransformError};
pub use models::*;
pub use observability::ServingMetrics;
pub use output::NormalizerConfig;
pub use pipeline::{InferencePipeline, ServingOptions};
pub use registry::{ArtifactFormat, ModelDescriptor, ModelRegistry};
