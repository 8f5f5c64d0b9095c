//! Error handling for the REST API server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use tracing::error;

use retain_core::error::RetainError;

/// API error type.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", message)
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INVARIANT_VIOLATION",
            message,
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code,
                message: self.message,
                details: self.details,
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<RetainError> for ApiError {
    fn from(err: RetainError) -> Self {
        let details = json!({
            "error_code": err.code().as_str(),
            "suggestion": err.suggestion(),
        });

        let api_error = match err {
            RetainError::NotFound { message, .. } => ApiError::not_found(message),
            RetainError::Validation { message, .. } => ApiError::validation(message),
            RetainError::InvariantViolation { message, .. } => {
                error!(%message, "Invariant violation reached the API");
                ApiError::invariant(message)
            }
            RetainError::Configuration(msg) => ApiError::bad_request(msg),
            RetainError::UnsupportedProvider { provider } => {
                ApiError::bad_request(format!("Unsupported provider: {}", provider))
            }
            RetainError::Llm { message, .. } => ApiError::internal(format!("LLM error: {}", message)),
            RetainError::Database { message, .. } => {
                ApiError::internal(format!("Database error: {}", message))
            }
            RetainError::Io(e) => ApiError::internal(format!("IO error: {}", e)),
        };

        api_error.with_details(details)
    }
}

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use retain_core::error::{ErrorCode, ResourceKind};

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ApiError::from(RetainError::not_found(ResourceKind::Problem, "abc"));
        assert_eq!(err.status, StatusCode::NOT_FOUND);
        assert_eq!(err.details.unwrap()["error_code"], "PRB_001");
    }

    #[test]
    fn test_validation_maps_to_422() {
        let err = ApiError::from(RetainError::missing_field("title"));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            err.details.unwrap()["suggestion"],
            "Provide a non-empty 'title'"
        );
    }

    #[test]
    fn test_invariant_maps_to_500() {
        let err = ApiError::from(RetainError::invariant(
            ErrorCode::InvMissingSchedule,
            "no schedule",
        ));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "INVARIANT_VIOLATION");
    }

    #[test]
    fn test_response_body_shape() {
        let response = ApiError::unauthorized("Missing X-User-Id header").into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bytes =
            tokio_test::block_on(axum::body::to_bytes(response.into_body(), usize::MAX)).unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "Missing X-User-Id header");
    }
}
