//! Review endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use retain_core::engine::{DueProblem, ReviewResult};
use retain_core::types::ReviewSubmission;

use crate::error::ApiResult;
use crate::extract::UserId;
use crate::state::AppState;

/// Submit a judged review attempt.
/// POST /reviews/:problem_id
pub async fn submit_review(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(problem_id): Path<Uuid>,
    Json(request): Json<ReviewSubmission>,
) -> ApiResult<Json<ReviewResult>> {
    let result = state
        .engine
        .submit_review(&user_id, problem_id, request)
        .await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct DueQuery {
    /// Reference date, defaults to today.
    pub as_of: Option<NaiveDate>,
}

/// GET /reviews/due?as_of=YYYY-MM-DD
pub async fn list_due(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Query(query): Query<DueQuery>,
) -> ApiResult<Json<Vec<DueProblem>>> {
    Ok(Json(state.engine.list_due(&user_id, query.as_of).await?))
}
