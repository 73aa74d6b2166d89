use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;
use transitflow::{Error, ErrorKind};

/// Error returned by every handler, rendered as `{ "detail": ... }`.
#[derive(Debug)]
pub enum ApiError {
    Domain(Error),
    BadRequest(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(value: Error) -> Self {
        ApiError::Domain(value)
    }
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::Domain(err) => match err.kind() {
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, err.to_string()),
                ErrorKind::PreconditionFailed | ErrorKind::Validation => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                ErrorKind::Internal => {
                    error!("Internal error: {err}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Internal server error".to_string(),
                    )
                }
            },
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::Internal(context) => {
                error!("Internal error: {context}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_status_codes() {
        let cases = [
            (Error::TripNotFound("t1".into()), StatusCode::NOT_FOUND),
            (Error::ModelNotReady, StatusCode::BAD_REQUEST),
            (Error::NoObservations, StatusCode::BAD_REQUEST),
            (Error::InvalidDateTime("x".into()), StatusCode::BAD_REQUEST),
            (Error::CorruptModel("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_and_detail().0, status);
        }
    }

    #[test]
    fn internal_details_stay_private() {
        let (_, detail) = ApiError::from(Error::Storage("disk on fire".into())).status_and_detail();
        assert_eq!(detail, "Internal server error");
    }
}
