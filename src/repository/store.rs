use crate::{
    error::Error,
    prediction::FeatureSource,
    repository::{NewObservation, Observation, ObservationFilter},
};

/// Persistent side of the pipeline: the feed lookups the feature builder
/// joins against, plus the observation table.
pub trait Store: FeatureSource + Send + Sync {
    /// Observations matching `filter`, oldest id first.
    fn observations(&self, filter: &ObservationFilter) -> Result<Vec<Observation>, Error>;
    fn count_observations(&self, filter: &ObservationFilter) -> Result<usize, Error>;
    /// Stores the observation and returns it with its assigned id.
    fn insert_observation(&self, observation: NewObservation) -> Result<Observation, Error>;
}
