pub mod error;
pub mod gtfs;
pub mod prediction;
pub mod repository;
pub mod shared;

pub use error::{Error, ErrorKind};

pub mod prelude {
    pub use crate::error::{Error, ErrorKind};
    pub use crate::gtfs::GtfsReader;
    pub use crate::prediction::{
        CacheConfig, CrowdPredictor, FeatureContext, FeatureSource, ForestConfig, MemoryStore,
        ModelBundle, PredictionCache, PredictionRequest, PredictionResponse, PredictionService,
    };
    pub use crate::repository::{
        CrowdLevel, NewObservation, Observation, ObservationFilter, Repository, Route, Stop,
        StopAmenities, StopTime, Store, Trip,
    };
    pub use crate::shared::Time;
}
