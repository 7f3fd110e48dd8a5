use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure while turning one artifact file into a predictor.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed artifact: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid artifact: {0}")]
    Invalid(String),
}

/// Raised by a predictor when it cannot score a row.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct InferenceError(pub String);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error("model for product '{0}' not found")]
    ProductNotFound(String),
    #[error("predictor for product '{product}' failed: {reason}")]
    Invocation { product: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid or missing parameters")]
    InvalidParameters,
    #[error("Problem with request: {0}")]
    Request(#[from] PredictionError),
    #[error("invalid request: {0}")]
    BadRequest(String),
    #[error("metrics unavailable: {0}")]
    Metrics(String),
    #[error("prediction task failed: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidParameters | ServiceError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Request(PredictionError::ProductNotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Request(PredictionError::Invocation { .. }) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServiceError::Metrics(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.to_string(),
        })
    }

    /// Renders the error with a 200 status, as older clients expect.
    pub fn into_legacy_response(self) -> Response {
        (StatusCode::OK, axum::Json(self.body())).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (self.status_code(), axum::Json(self.body())).into_response()
    }
}
