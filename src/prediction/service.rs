//! Glue between storage, the model and the cache.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::{
    error::Error,
    prediction::{
        cache::{CacheStats, KeyValueStore, PredictionCache},
        history,
        model::{CrowdPredictor, TrainingReport},
    },
    repository::{CrowdLevel, NewObservation, Observation, ObservationFilter, Store},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub trip_id: String,
    pub stop_id: String,
    /// `HH:MM:SS`
    pub departure_time: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub trip_id: String,
    pub stop_id: String,
    pub departure_time: String,
    pub date: String,
    pub predicted_crowd_level: CrowdLevel,
    pub confidence: f64,
    pub historical_average: Option<u32>,
    pub features_used: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainSummary {
    pub accuracy: f64,
    pub observations_used: usize,
    pub model_saved: bool,
    #[serde(skip)]
    pub report: TrainingReport,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObservationPage {
    pub observations: Vec<Observation>,
    pub total: usize,
}

pub struct PredictionService<S: Store, K: KeyValueStore> {
    store: S,
    predictor: CrowdPredictor,
    cache: PredictionCache<K>,
    model_path: Option<PathBuf>,
}

impl<S: Store, K: KeyValueStore> PredictionService<S, K> {
    pub fn new(store: S, predictor: CrowdPredictor, cache: PredictionCache<K>) -> Self {
        Self {
            store,
            predictor,
            cache,
            model_path: None,
        }
    }

    /// Where [`train`](Self::train) persists the fitted bundle.
    pub fn with_model_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.model_path = Some(path.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn predictor(&self) -> &CrowdPredictor {
        &self.predictor
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn is_trained(&self) -> bool {
        self.predictor.is_trained()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Replaces the live bundle with the one stored at `path`.
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        self.predictor.load(path)?;
        self.cache.invalidate(None, None);
        Ok(())
    }

    /// Serves from the cache when possible, otherwise predicts and caches.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, Error> {
        let PredictionRequest {
            trip_id,
            stop_id,
            departure_time,
            date,
        } = request;
        if let Some(cached) = self.cache.get(trip_id, stop_id, departure_time, date) {
            return Ok(cached);
        }

        let generation = self.cache.generation();
        let prediction = self
            .predictor
            .predict(&self.store, trip_id, stop_id, departure_time, date)?;
        let historical_average = history::historical_average(&self.store, trip_id, stop_id)?;
        let response = PredictionResponse {
            trip_id: trip_id.clone(),
            stop_id: stop_id.clone(),
            departure_time: departure_time.clone(),
            date: date.clone(),
            predicted_crowd_level: prediction.crowd_level,
            confidence: prediction.confidence,
            historical_average,
            features_used: prediction.features_used,
        };
        self.cache
            .set_since(generation, trip_id, stop_id, departure_time, date, &response);
        Ok(response)
    }

    /// Retrains on every stored observation and swaps the new bundle in.
    pub fn train(&self) -> Result<TrainSummary, Error> {
        let observations = self.store.observations(&ObservationFilter::default())?;
        let report = self.predictor.train(&observations, &self.store)?;

        let model_saved = match &self.model_path {
            Some(path) => match self.predictor.save(path) {
                Ok(()) => true,
                Err(err) => {
                    error!("Error saving model to {}: {err}", path.display());
                    false
                }
            },
            None => false,
        };
        let invalidated = self.cache.invalidate(None, None);
        info!("Model retrained, {invalidated} cached predictions dropped");

        Ok(TrainSummary {
            accuracy: report.accuracy,
            observations_used: report.observations_used,
            model_saved,
            report,
        })
    }

    /// Stores a new observation for an existing trip and stop, then drops
    /// every cached prediction for that pair.
    pub fn record_observation(&self, observation: NewObservation) -> Result<Observation, Error> {
        if self.store.trip(&observation.trip_id).is_none() {
            return Err(Error::TripNotFound(observation.trip_id));
        }
        if self.store.stop(&observation.stop_id).is_none() {
            return Err(Error::StopNotFound(observation.stop_id));
        }
        let stored = self.store.insert_observation(observation)?;
        self.cache
            .invalidate(Some(&stored.trip_id), Some(&stored.stop_id));
        Ok(stored)
    }

    pub fn observations(
        &self,
        filter: &ObservationFilter,
        skip: usize,
        limit: usize,
    ) -> Result<ObservationPage, Error> {
        let total = self.store.count_observations(filter)?;
        let observations = self
            .store
            .observations(filter)?
            .into_iter()
            .skip(skip)
            .take(limit)
            .collect();
        Ok(ObservationPage {
            observations,
            total,
        })
    }
}
