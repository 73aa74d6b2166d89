use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;
use transitflow::Error;

use crate::{
    dto::{RouteDto, RoutesDto, StopTimeDto, TripStopsDto},
    error::ApiError,
    state::AppState,
};

pub async fn routes(State(state): State<Arc<AppState>>) -> Json<RoutesDto> {
    let repository = state.service.store();
    let routes = repository
        .routes()
        .iter()
        .map(|route| RouteDto::from(route, repository))
        .collect();
    Json(RoutesDto { routes })
}

pub async fn route(
    Path(route_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<RouteDto>, ApiError> {
    let repository = state.service.store();
    let route = repository
        .route_by_id(route_id.trim())
        .ok_or(Error::RouteNotFound(route_id))?;
    Ok(Json(RouteDto::from(route, repository)))
}

pub async fn trip_stops(
    Path(trip_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<TripStopsDto>, ApiError> {
    let repository = state.service.store();
    let trip = repository
        .trip_by_id(&trip_id)
        .ok_or_else(|| Error::TripNotFound(trip_id.clone()))?;
    let stops = repository
        .stop_times_by_trip_id(&trip.id)
        .unwrap_or_default()
        .into_iter()
        .map(|stop_time| StopTimeDto::from(stop_time, repository))
        .collect();
    Ok(Json(TripStopsDto {
        trip_id: trip.id.to_string(),
        route_id: trip.route_id.to_string(),
        stops,
    }))
}
