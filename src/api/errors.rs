use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::timeseries::engine::EngineError;

/// Client-visible failure taxonomy. Every variant renders a JSON body with
/// at least a `message` field; internal faults additionally log and carry a
/// short `error` string without exposing aggregation internals.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The query ran but matched nothing the caller may see.
    #[error("{0}")]
    NotFound(String),
    /// A caller-supplied parameter was rejected before touching the store.
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::NoData => Self::NotFound("No data found for this device".to_owned()),
            EngineError::Store(e) => Self::Internal(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "message": message })),
            Self::Validation(message) => (StatusCode::BAD_REQUEST, json!({ "message": message })),
            Self::Unauthorized(message) => {
                (StatusCode::UNAUTHORIZED, json!({ "message": message }))
            }
            Self::Internal(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error", "error": e.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_no_data_maps_to_not_found() {
        let err: ApiError = EngineError::NoData.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[test]
    fn engine_store_fault_maps_to_internal() {
        let err: ApiError = EngineError::Store(anyhow::anyhow!("connection refused")).into();
        assert!(matches!(err, ApiError::Internal(_)));
    }

    #[test]
    fn variants_map_to_expected_status_codes() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (
                ApiError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
