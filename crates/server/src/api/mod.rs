use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::state::AppState;

mod health;
mod observations;
mod predict;
mod routes;

pub use health::*;
pub use observations::*;
pub use predict::*;
pub use routes::*;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/v1/routes", get(routes))
        .route("/api/v1/routes/{route_id}", get(route))
        .route("/api/v1/trips/{trip_id}/stops", get(trip_stops))
        .route("/api/v1/predict", post(predict))
        .route(
            "/api/v1/observations",
            get(list_observations).post(create_observation),
        )
        .route("/api/v1/train", post(train))
        .route("/api/v1/health", get(health))
        .with_state(state)
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "TransitFlow API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "routes": "/api/v1/routes",
            "route": "/api/v1/routes/{route_id}",
            "trip_stops": "/api/v1/trips/{trip_id}/stops",
            "predict": "/api/v1/predict",
            "observations": "/api/v1/observations",
            "train": "/api/v1/train",
            "health": "/api/v1/health",
        }
    }))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root_lists_endpoints() {
        let Json(value) = root().await;
        assert_eq!(value["message"], "TransitFlow API");
        assert_eq!(value["endpoints"]["predict"], "/api/v1/predict");
    }
}
