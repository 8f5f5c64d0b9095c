//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub classifier: ClassifierHealth,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ClassifierHealth {
    pub service: String,
    pub configured: bool,
}

/// Health check endpoint.
/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        classifier: ClassifierHealth {
            service: state.classifier_service.clone(),
            configured: state.classifier_configured,
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}
