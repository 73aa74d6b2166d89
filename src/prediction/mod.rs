//! Crowd level prediction: features, the classifier, and the cached service
//! on top of them.

pub mod cache;
pub mod encoding;
pub mod features;
pub mod forest;
pub mod history;
pub mod metrics;
pub mod model;
pub mod service;
pub mod split;

pub use cache::{CacheConfig, CacheError, CacheStats, KeyValueStore, MemoryStore, PredictionCache};
pub use features::{
    FeatureContext, FeatureRow, FeatureSource, RouteAttributes, StopAttributes, TripAttributes,
    build_row,
};
pub use forest::{ForestConfig, MaxFeatures, RandomForest};
pub use history::historical_average;
pub use metrics::ClassificationReport;
pub use model::{CrowdPredictor, ModelBundle, Prediction, TrainingReport};
pub use service::{
    ObservationPage, PredictionRequest, PredictionResponse, PredictionService, TrainSummary,
};
