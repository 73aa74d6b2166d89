use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use std::sync::Arc;
use transitflow::{prediction::ObservationPage, prelude::*};

use crate::{error::ApiError, state::AppState};

const DEFAULT_LIMIT: usize = 100;
const MAX_LIMIT: usize = 1000;

#[derive(Debug, Deserialize)]
pub struct ObservationQuery {
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub trip_id: Option<String>,
    pub stop_id: Option<String>,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

pub async fn list_observations(
    Query(query): Query<ObservationQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ObservationPage>, ApiError> {
    if !(1..=MAX_LIMIT).contains(&query.limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    let filter = ObservationFilter {
        trip_id: query.trip_id,
        stop_id: query.stop_id,
    };
    let page = state.service.observations(&filter, query.skip, query.limit)?;
    Ok(Json(page))
}

/// Stores the observation and drops cached predictions for its trip and stop.
pub async fn create_observation(
    State(state): State<Arc<AppState>>,
    Json(observation): Json<NewObservation>,
) -> Result<Json<Observation>, ApiError> {
    let stored = state.service.record_observation(observation)?;
    Ok(Json(stored))
}
