//! Attempt endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use retain_core::engine::AttemptView;

use crate::error::ApiResult;
use crate::extract::UserId;
use crate::state::AppState;

/// An attempt with its problem and the original solution.
/// GET /attempts/:id
pub async fn get_attempt(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AttemptView>> {
    Ok(Json(state.engine.get_attempt_with_original(&user_id, id).await?))
}
