use std::io;
use thiserror::Error;

use crate::gtfs;

/// Errors raised by the repository and the prediction pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Trip not found: {0}")]
    TripNotFound(String),
    #[error("Stop not found: {0}")]
    StopNotFound(String),
    #[error("Route not found: {0}")]
    RouteNotFound(String),
    #[error("Model must be trained before making predictions")]
    ModelNotReady,
    #[error("No observations found for training")]
    NoObservations,
    #[error("Invalid date/time '{0}', expected YYYY-MM-DD HH:MM:SS")]
    InvalidDateTime(String),
    #[error("Insufficient data: {0}")]
    InsufficientData(String),
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),
    #[error("Model file is corrupt: {0}")]
    CorruptModel(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Gtfs error: {0}")]
    Gtfs(#[from] gtfs::Error),
}

/// How the boundary layer should surface an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A referenced trip, stop or route does not exist.
    NotFound,
    /// The request is valid but the system is not in a state to serve it.
    /// The caller may retry once the precondition holds.
    PreconditionFailed,
    /// The request itself is malformed.
    Validation,
    /// Anything else. Details stay in the logs.
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TripNotFound(_) | Error::StopNotFound(_) | Error::RouteNotFound(_) => {
                ErrorKind::NotFound
            }
            Error::ModelNotReady | Error::NoObservations => ErrorKind::PreconditionFailed,
            Error::InvalidDateTime(_) | Error::InsufficientData(_) | Error::InvalidObservation(_) => {
                ErrorKind::Validation
            }
            Error::CorruptModel(_)
            | Error::Storage(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Csv(_)
            | Error::Gtfs(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untrained_model_is_a_precondition_failure() {
        assert_eq!(Error::ModelNotReady.kind(), ErrorKind::PreconditionFailed);
        assert_eq!(Error::NoObservations.kind(), ErrorKind::PreconditionFailed);
    }

    #[test]
    fn missing_entities_are_not_found() {
        assert_eq!(Error::TripNotFound("t".into()).kind(), ErrorKind::NotFound);
        assert_eq!(Error::StopNotFound("s".into()).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn corrupt_model_is_internal() {
        assert_eq!(
            Error::CorruptModel("missing scaler".into()).kind(),
            ErrorKind::Internal
        );
    }
}
