//! End-to-end inference pipeline
//!
//! Orchestrates validation, preprocessing, cached model fetch, inference,
//! and output normalization for single records and batches. One pipeline
//! is constructed at process start and passed explicitly to its callers;
//! there is no ambient global state beyond the metrics registry.

use crate::backend::PriceModel;
use crate::cache::ModelCache;
use crate::contract;
use crate::error::{ArtifactError, PipelineError, PipelineResult};
use crate::models::{BatchOutcome, PricePrediction, RawRecord, RawTable, RowPrediction};
use crate::observability::ServingMetrics;
use crate::output::{NormalizerConfig, OutputNormalizer};
use crate::preprocess::Preprocessor;
use crate::registry::{loader_for, ModelRegistry};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Instant;
use tracing::{debug, info};

/// Pipeline construction options.
#[derive(Debug, Clone)]
pub struct ServingOptions {
    /// Directory holding one artifact file per registered model.
    pub models_dir: PathBuf,
    /// The preprocessing artifact shared by every registered model.
    pub preprocessor_path: PathBuf,
    /// Upper bound on batch size, limiting one transform's memory use.
    pub max_batch_rows: usize,
    pub normalizer: NormalizerConfig,
}

impl Default for ServingOptions {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            preprocessor_path: PathBuf::from("models/preprocessor.json"),
            max_batch_rows: 10_000,
            normalizer: NormalizerConfig::default(),
        }
    }
}

/// The serving core: registry, cache, preprocessor, and normalizer behind
/// the two prediction entry points.
pub struct InferencePipeline {
    registry: ModelRegistry,
    cache: ModelCache,
    preprocessor: OnceLock<Result<Arc<Preprocessor>, ArtifactError>>,
    normalizer: OutputNormalizer,
    options: ServingOptions,
    metrics: ServingMetrics,
}

impl InferencePipeline {
    /// Build a pipeline over the standard model catalog.
    pub fn new(options: ServingOptions) -> Result<Self, ArtifactError> {
        let registry = ModelRegistry::with_default_catalog(&options.models_dir)?;
        Ok(Self::with_registry(options, registry))
    }

    /// Build a pipeline over an explicit registry.
    pub fn with_registry(options: ServingOptions, registry: ModelRegistry) -> Self {
        Self {
            registry,
            cache: ModelCache::new(),
            preprocessor: OnceLock::new(),
            normalizer: OutputNormalizer::with_config(options.normalizer.clone()),
            metrics: ServingMetrics::new(),
            options,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn options(&self) -> &ServingOptions {
        &self.options
    }

    /// Whether the shared preprocessing artifact is currently readable.
    /// Used by readiness checks; does not consume the one cached load.
    pub fn preprocessor_available(&self) -> bool {
        match self.preprocessor.get() {
            Some(outcome) => outcome.is_ok(),
            None => self.options.preprocessor_path.exists(),
        }
    }

    /// Fetch the shared preprocessing adapter, loading it on first use.
    /// The outcome, success or failure, is memoized for the process
    /// lifetime just like a model load.
    fn preprocessor(&self) -> Result<Arc<Preprocessor>, ArtifactError> {
        self.preprocessor
            .get_or_init(|| Preprocessor::load(&self.options.preprocessor_path).map(Arc::new))
            .clone()
    }

    fn model(&self, logical_name: &str) -> PipelineResult<(Arc<dyn PriceModel>, String)> {
        let descriptor = self.registry.resolve(logical_name)?;
        let loader = loader_for(descriptor.artifact_format);
        let model = self
            .cache
            .get_or_load(descriptor, || loader(&descriptor.artifact_path))?;
        Ok((model, descriptor.logical_name.clone()))
    }

    /// Predict one diamond's price.
    ///
    /// Stages: contract validation, preprocessing, cached model fetch,
    /// inference, output normalization. Any stage failure short-circuits
    /// with an error identifying the stage and cause.
    pub fn predict_one(
        &self,
        raw: &RawRecord,
        model_name: &str,
    ) -> PipelineResult<PricePrediction> {
        let start = Instant::now();
        let result = self.predict_one_inner(raw, model_name);
        self.metrics
            .observe_inference_latency(start.elapsed().as_secs_f64());

        match &result {
            Ok(prediction) => {
                self.metrics.inc_predictions(1);
                debug!(model = %prediction.model, price = prediction.price, "prediction served");
            }
            Err(error) => {
                self.metrics.inc_prediction_errors();
                debug!(model = %model_name, error = %error, "prediction failed");
            }
        }
        result
    }

    fn predict_one_inner(
        &self,
        raw: &RawRecord,
        model_name: &str,
    ) -> PipelineResult<PricePrediction> {
        let record = contract::validate(raw)?;
        let preprocessor = self.preprocessor()?;
        let matrix = preprocessor.transform(std::slice::from_ref(&record))?;
        let (model, logical_name) = self.model(model_name)?;
        let output = model.predict(&matrix)?;
        let price = self.normalizer.scalar(&output)?;

        Ok(PricePrediction {
            price,
            model: logical_name,
            generated_at: chrono::Utc::now().timestamp(),
        })
    }

    /// Predict prices for a whole table.
    ///
    /// Rows failing validation are excluded and reported individually;
    /// surviving rows go through preprocessing and inference together in
    /// one matrix pass. Each prediction carries its original row index.
    pub fn predict_batch(
        &self,
        table: &RawTable,
        model_name: &str,
    ) -> PipelineResult<BatchOutcome> {
        let start = Instant::now();
        let result = self.predict_batch_inner(table, model_name);
        self.metrics
            .observe_inference_latency(start.elapsed().as_secs_f64());

        match &result {
            Ok(outcome) => {
                self.metrics.inc_predictions(outcome.predictions.len() as u64);
                self.metrics.inc_rows_rejected(outcome.rejected.len() as u64);
                info!(
                    model = %outcome.model,
                    rows = table.len(),
                    served = outcome.predictions.len(),
                    rejected = outcome.rejected.len(),
                    "batch prediction served"
                );
            }
            Err(error) => {
                self.metrics.inc_prediction_errors();
                debug!(model = %model_name, error = %error, "batch prediction failed");
            }
        }
        result
    }

    fn predict_batch_inner(
        &self,
        table: &RawTable,
        model_name: &str,
    ) -> PipelineResult<BatchOutcome> {
        if table.len() > self.options.max_batch_rows {
            return Err(PipelineError::BatchTooLarge {
                rows: table.len(),
                max: self.options.max_batch_rows,
            });
        }

        let validation = contract::validate_batch(table)?;
        let logical_name = self.registry.resolve(model_name)?.logical_name.clone();

        if validation.accepted.is_empty() {
            return Ok(BatchOutcome {
                model: logical_name,
                predictions: Vec::new(),
                rejected: validation.rejected,
            });
        }

        let records: Vec<_> = validation
            .accepted
            .iter()
            .map(|(_, record)| record.clone())
            .collect();
        let preprocessor = self.preprocessor()?;
        let matrix = preprocessor.transform(&records)?;
        let (model, _) = self.model(model_name)?;
        let output = model.predict(&matrix)?;
        let prices = self.normalizer.series(&output, records.len())?;

        let predictions = validation
            .accepted
            .iter()
            .zip(prices)
            .map(|((row_index, _), price)| RowPrediction {
                row_index: *row_index,
                price,
            })
            .collect();

        Ok(BatchOutcome {
            model: logical_name,
            predictions,
            rejected: validation.rejected,
        })
    }
}
