//! HTTP API for predictions, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use pricer_lib::{InferencePipeline, PipelineError, PricePrediction, RawRecord, RawTable};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<InferencePipeline>,
}

impl AppState {
    pub fn new(pipeline: Arc<InferencePipeline>) -> Self {
        Self { pipeline }
    }
}

/// Single-record prediction request
#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub model: String,
    pub record: RawRecord,
}

/// Batch prediction request
#[derive(Debug, Deserialize)]
pub struct BatchPredictRequest {
    pub model: String,
    pub rows: Vec<RawRecord>,
}

/// Batch prediction response: surviving rows with their passthrough
/// columns plus `predicted_price`, and the rows excluded by validation.
#[derive(Debug, Serialize)]
pub struct BatchPredictResponse {
    pub model: String,
    pub rows: Vec<RawRecord>,
    pub rejected: Vec<RejectedRow>,
}

#[derive(Debug, Serialize)]
pub struct RejectedRow {
    pub row_index: usize,
    pub error: String,
}

/// One registry entry in the model listing
#[derive(Debug, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub format: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub models_available: usize,
}

type ApiError = (StatusCode, Json<ErrorBody>);

/// Registered models whose artifacts are present on storage
async fn list_models(State(state): State<Arc<AppState>>) -> Json<Vec<ModelInfo>> {
    let models = state
        .pipeline
        .registry()
        .list()
        .into_iter()
        .map(|descriptor| ModelInfo {
            name: descriptor.logical_name.clone(),
            format: descriptor.artifact_format.as_str(),
        })
        .collect();
    Json(models)
}

/// Predict one diamond's price
async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PricePrediction>, ApiError> {
    let pipeline = Arc::clone(&state.pipeline);
    // Model loads block on disk, so keep them off the async workers.
    let prediction = tokio::task::spawn_blocking(move || {
        pipeline.predict_one(&request.record, &request.model)
    })
    .await
    .map_err(join_error)?
    .map_err(error_response)?;

    Ok(Json(prediction))
}

/// Predict prices for a table of rows
async fn predict_batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchPredictRequest>,
) -> Result<Json<BatchPredictResponse>, ApiError> {
    let pipeline = Arc::clone(&state.pipeline);
    let response = tokio::task::spawn_blocking(move || {
        let table = RawTable::from_rows(request.rows);
        let outcome = pipeline.predict_batch(&table, &request.model)?;
        Ok(BatchPredictResponse {
            rows: outcome.to_rows(&table),
            rejected: outcome
                .rejected
                .iter()
                .map(|reject| RejectedRow {
                    row_index: reject.row_index,
                    error: reject.error.to_string(),
                })
                .collect(),
            model: outcome.model,
        })
    })
    .await
    .map_err(join_error)?
    .map_err(error_response)?;

    Ok(Json(response))
}

/// Health check response - returns 200 while the process is serving
async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let models_available = state.pipeline.registry().list().len();
    let ready = state.pipeline.preprocessor_available() && models_available > 0;

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadinessResponse {
            ready,
            models_available,
        }),
    )
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder.encode(&metric_families, &mut buffer).unwrap();

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

fn error_response(error: PipelineError) -> ApiError {
    let status = match &error {
        PipelineError::Feature(_)
        | PipelineError::Transform(_)
        | PipelineError::BatchTooLarge { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::ModelNotFound { .. } => StatusCode::NOT_FOUND,
        PipelineError::Artifact(_) => StatusCode::SERVICE_UNAVAILABLE,
        PipelineError::Inference { .. } | PipelineError::UnexpectedOutputShape { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
}

fn join_error(error: tokio::task::JoinError) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: format!("prediction task failed: {}", error),
        }),
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/models", get(list_models))
        .route("/predict", post(predict))
        .route("/predict/batch", post(predict_batch))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
