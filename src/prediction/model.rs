//! The crowd classifier and everything fitted alongside it.
//!
//! [`ModelBundle`] is immutable once built. [`CrowdPredictor`] holds the
//! current bundle behind an `Arc` and training swaps in a complete new one,
//! so a concurrent `predict` sees either the old bundle or the new one.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    fs,
    path::Path,
    sync::{Arc, PoisonError, RwLock},
    time::Instant,
};
use tracing::{debug, info};

use crate::{
    Error,
    prediction::{
        encoding::{StandardScaler, ZoneEncoder},
        features::{self, FEATURE_COUNT, FEATURE_NAMES, FeatureRow, FeatureSource, NUMERIC_FEATURES},
        forest::{ForestConfig, RandomForest},
        metrics::{ClassificationReport, accuracy},
        split::{SPLIT_SEED, TEST_RATIO, stratified_split},
    },
    repository::{CrowdLevel, Observation},
};

/// Format of the combined `date` and `departure_time` request fields.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bumped whenever the persisted layout changes.
pub const BUNDLE_VERSION: u32 = 1;

/// Classifier, zone encoder, scaler and feature ordering, versioned together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: u32,
    pub feature_names: Vec<String>,
    pub classes: Vec<CrowdLevel>,
    pub encoder: ZoneEncoder,
    pub scaler: StandardScaler,
    pub forest: RandomForest,
    pub trained: bool,
}

impl Default for ModelBundle {
    fn default() -> Self {
        Self::untrained()
    }
}

impl ModelBundle {
    pub fn untrained() -> Self {
        Self {
            version: BUNDLE_VERSION,
            feature_names: feature_names(),
            classes: Vec::new(),
            encoder: ZoneEncoder::default(),
            scaler: StandardScaler::default(),
            forest: RandomForest::default(),
            trained: false,
        }
    }

    /// Encodes and scales a raw row with this bundle's fitted parameters.
    pub fn encode(&self, row: &FeatureRow) -> [f64; FEATURE_COUNT] {
        let mut values = row.values(self.encoder.transform(&row.zone_id));
        NUMERIC_FEATURES
            .iter()
            .enumerate()
            .for_each(|(column, index)| {
                values[*index] = self.scaler.transform_value(column, values[*index])
            });
        values
    }

    /// Most likely crowd level for a raw row and its probability.
    pub fn classify(&self, row: &FeatureRow) -> Result<(CrowdLevel, f64), Error> {
        if !self.trained {
            return Err(Error::ModelNotReady);
        }
        let (class, confidence) = self.forest.predict(&self.encode(row));
        let label = self.classes.get(class).copied().ok_or_else(|| {
            Error::CorruptModel(format!("class index {class} has no crowd level"))
        })?;
        Ok((label, confidence))
    }

    /// Checks that the members belong together.
    pub fn validate(&self) -> Result<(), Error> {
        if self.version != BUNDLE_VERSION {
            return Err(Error::CorruptModel(format!(
                "unsupported bundle version {}",
                self.version
            )));
        }
        if self.feature_names != feature_names() {
            return Err(Error::CorruptModel(format!(
                "feature ordering {:?} does not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if !self.trained {
            return if self.forest.trees().is_empty() {
                Ok(())
            } else {
                Err(Error::CorruptModel("untrained bundle carries a forest".into()))
            };
        }
        if self.scaler.width() != NUMERIC_FEATURES.len() || !self.scaler.is_consistent() {
            return Err(Error::CorruptModel(format!(
                "scaler covers {} columns, expected {}",
                self.scaler.width(),
                NUMERIC_FEATURES.len()
            )));
        }
        if self.encoder.classes().is_empty() {
            return Err(Error::CorruptModel("zone encoder is empty".into()));
        }
        if !self.forest.is_consistent()
            || self.forest.n_features() != FEATURE_COUNT
            || self.forest.n_classes() != self.classes.len()
        {
            return Err(Error::CorruptModel(
                "forest does not match the feature set or class list".into(),
            ));
        }
        Ok(())
    }
}

fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|name| name.to_string()).collect()
}

/// Result of a successful training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub accuracy: f64,
    pub report: ClassificationReport,
    /// Labeled observations that went into fitting and evaluation.
    pub observations_used: usize,
    pub train_size: usize,
    pub test_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub crowd_level: CrowdLevel,
    /// Highest class probability, in `[0, 1]`.
    pub confidence: f64,
    pub features_used: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CrowdPredictor {
    config: ForestConfig,
    bundle: RwLock<Arc<ModelBundle>>,
}

impl CrowdPredictor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            bundle: RwLock::new(Arc::new(ModelBundle::untrained())),
        }
    }

    /// The bundle currently serving predictions.
    pub fn bundle(&self) -> Arc<ModelBundle> {
        self.bundle
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_trained(&self) -> bool {
        self.bundle().trained
    }

    fn commit(&self, bundle: ModelBundle) {
        *self.bundle.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(bundle);
    }

    /// Fits a new bundle on the labeled observations and swaps it in.
    /// The current bundle is untouched unless every step succeeds.
    pub fn train<S>(&self, observations: &[Observation], source: &S) -> Result<TrainingReport, Error>
    where
        S: FeatureSource + ?Sized,
    {
        if observations.is_empty() {
            return Err(Error::NoObservations);
        }
        let now = Instant::now();
        let labeled: Vec<(&Observation, CrowdLevel)> = observations
            .iter()
            .filter_map(|observation| observation.crowd_level.map(|level| (observation, level)))
            .collect();
        if labeled.is_empty() {
            return Err(Error::InsufficientData(
                "none of the observations carry a crowd level".into(),
            ));
        }
        debug!(
            "Preparing features for {} of {} observations",
            labeled.len(),
            observations.len()
        );

        let rows: Vec<FeatureRow> = labeled
            .iter()
            .map(|(observation, _)| {
                features::build_row(
                    source,
                    &observation.trip_id,
                    &observation.stop_id,
                    observation.observation_time,
                )
            })
            .collect();
        let classes: Vec<CrowdLevel> = labeled
            .iter()
            .map(|(_, level)| *level)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let y: Vec<usize> = labeled
            .iter()
            .map(|(_, level)| classes.binary_search(level).unwrap_or_default())
            .collect();

        let split = stratified_split(&y, classes.len(), TEST_RATIO, SPLIT_SEED)?;

        let encoder = ZoneEncoder::fit(rows.iter().map(|row| row.zone_id.as_ref()));
        let numeric: Vec<_> = rows.iter().map(FeatureRow::numeric_values).collect();
        let scaler = StandardScaler::fit(&numeric)?;
        let mut candidate = ModelBundle {
            encoder,
            scaler,
            classes,
            ..ModelBundle::untrained()
        };
        let x: Vec<[f64; FEATURE_COUNT]> = rows.iter().map(|row| candidate.encode(row)).collect();

        let x_train: Vec<_> = split.train.iter().map(|i| x[*i]).collect();
        let y_train: Vec<_> = split.train.iter().map(|i| y[*i]).collect();
        info!(
            "Training random forest with {} trees on {} rows",
            self.config.n_estimators,
            x_train.len()
        );
        candidate.forest =
            RandomForest::fit(&self.config, &x_train, &y_train, candidate.classes.len())?;

        let y_test: Vec<_> = split.test.iter().map(|i| y[*i]).collect();
        let y_pred: Vec<_> = split
            .test
            .par_iter()
            .map(|i| candidate.forest.predict(&x[*i]).0)
            .collect();
        let class_names: Vec<String> = candidate
            .classes
            .iter()
            .map(|level| level.to_string())
            .collect();
        let report = ClassificationReport::new(&y_test, &y_pred, &class_names);
        let accuracy = accuracy(&y_test, &y_pred);

        candidate.trained = true;
        candidate.validate()?;
        self.commit(candidate);

        info!(
            "Model training completed in {:?}. Accuracy: {accuracy:.3}",
            now.elapsed()
        );
        info!("Classification report:\n{report}");
        Ok(TrainingReport {
            accuracy,
            report,
            observations_used: labeled.len(),
            train_size: split.train.len(),
            test_size: split.test.len(),
        })
    }

    /// Predicts the crowd level of `trip_id` at `stop_id` for a departure at
    /// `date` (`YYYY-MM-DD`) and `departure_time` (`HH:MM:SS`).
    pub fn predict<S>(
        &self,
        source: &S,
        trip_id: &str,
        stop_id: &str,
        departure_time: &str,
        date: &str,
    ) -> Result<Prediction, Error>
    where
        S: FeatureSource + ?Sized,
    {
        let bundle = self.bundle();
        if !bundle.trained {
            return Err(Error::ModelNotReady);
        }
        let at = parse_departure(date, departure_time)?;
        if source.trip(trip_id).is_none() {
            return Err(Error::TripNotFound(trip_id.to_string()));
        }
        if source.stop(stop_id).is_none() {
            return Err(Error::StopNotFound(stop_id.to_string()));
        }

        let row = features::build_row(source, trip_id, stop_id, at);
        let (crowd_level, confidence) = bundle.classify(&row)?;
        Ok(Prediction {
            crowd_level,
            confidence,
            features_used: bundle.feature_names.clone(),
        })
    }

    /// Writes the current bundle as JSON. The file is replaced atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let bundle = self.bundle();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(bundle.as_ref())?)?;
        fs::rename(&tmp, path)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    /// Replaces the current bundle with the one stored at `path`.
    /// A blob that is missing members or mixes incompatible ones is rejected
    /// and the current bundle stays in place.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let bundle: ModelBundle =
            serde_json::from_slice(&bytes).map_err(|err| Error::CorruptModel(err.to_string()))?;
        bundle.validate()?;
        self.commit(bundle);
        info!("Model loaded from {}", path.display());
        Ok(())
    }
}

/// Parses the request's date and time into one timestamp, no timezone attached.
pub fn parse_departure(date: &str, departure_time: &str) -> Result<NaiveDateTime, Error> {
    let value = format!("{date} {departure_time}");
    NaiveDateTime::parse_from_str(&value, DATETIME_FORMAT).map_err(|_| Error::InvalidDateTime(value))
}
