use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use transitflow::prelude::*;

use crate::{error::ApiError, state::AppState};

pub async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let response = state.service.predict(&request)?;
    Ok(Json(response))
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub message: &'static str,
    pub accuracy: f64,
    pub observations_used: usize,
    pub model_saved: bool,
}

/// Retrains on a blocking thread, the runtime keeps serving meanwhile.
pub async fn train(State(state): State<Arc<AppState>>) -> Result<Json<TrainResponse>, ApiError> {
    info!("Retraining model...");
    let summary = tokio::task::spawn_blocking(move || state.service.train())
        .await
        .map_err(|err| ApiError::Internal(format!("training task failed: {err}")))??;
    Ok(Json(TrainResponse {
        message: "Model training completed",
        accuracy: summary.accuracy,
        observations_used: summary.observations_used,
        model_saved: summary.model_saved,
    }))
}
