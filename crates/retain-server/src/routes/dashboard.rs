use axum::{extract::State, Json};

use retain_core::engine::DashboardStats;

use crate::error::ApiResult;
use crate::extract::UserId;
use crate::state::AppState;

/// GET /dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    UserId(user_id): UserId,
) -> ApiResult<Json<DashboardStats>> {
    Ok(Json(state.engine.dashboard(&user_id).await?))
}
