use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use transitflow::prediction::CacheStats;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthDto {
    pub status: &'static str,
    pub model_trained: bool,
    pub cache_stats: CacheStats,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    Json(HealthDto {
        status: "healthy",
        model_trained: state.service.is_trained(),
        cache_stats: state.service.cache_stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support;

    #[tokio::test]
    async fn reports_untrained_model() {
        let Json(health) = health(State(test_support::state())).await;
        assert_eq!(health.status, "healthy");
        assert!(!health.model_trained);
        assert_eq!(health.cache_stats, CacheStats::default());
    }
}
