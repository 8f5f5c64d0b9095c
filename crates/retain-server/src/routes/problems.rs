//! Problem endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use retain_core::engine::SubmissionResult;
use retain_core::types::{Attempt, NewProblem, Problem, ReviewSchedule};

use crate::error::ApiResult;
use crate::extract::UserId;
use crate::state::AppState;

/// Submit a solved problem. A repeat of a known reference is re-logged.
/// POST /problems
pub async fn create_problem(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(request): Json<NewProblem>,
) -> ApiResult<(StatusCode, Json<SubmissionResult>)> {
    let result = state.engine.create_problem(&user_id, request).await?;
    let status = if result.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)))
}

/// GET /problems
pub async fn list_problems(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> ApiResult<Json<Vec<Problem>>> {
    Ok(Json(state.engine.list_problems(&user_id).await?))
}

/// GET /problems/:id
pub async fn get_problem(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Problem>> {
    Ok(Json(state.engine.get_problem(&user_id, id).await?))
}

/// Attempts on a problem, oldest first.
/// GET /problems/:id/attempts
pub async fn problem_history(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<Attempt>>> {
    Ok(Json(state.engine.problem_history(&user_id, id).await?))
}

/// GET /problems/:id/schedule
pub async fn get_schedule(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ReviewSchedule>> {
    Ok(Json(state.engine.get_schedule(&user_id, id).await?))
}

/// GET /problems/weak
pub async fn list_weak(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> ApiResult<Json<Vec<Problem>>> {
    Ok(Json(state.engine.list_weak(&user_id).await?))
}
