//! Route definitions for the REST API.

mod attempts;
mod dashboard;
mod health;
mod problems;
mod reviews;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Problems
        .route(
            "/problems",
            post(problems::create_problem).get(problems::list_problems),
        )
        .route("/problems/weak", get(problems::list_weak))
        .route("/problems/:id", get(problems::get_problem))
        .route("/problems/:id/attempts", get(problems::problem_history))
        .route("/problems/:id/schedule", get(problems::get_schedule))
        // Reviews
        .route("/reviews/due", get(reviews::list_due))
        .route("/reviews/:problem_id", post(reviews::submit_review))
        // Attempts
        .route("/attempts/:id", get(attempts::get_attempt))
        // Dashboard
        .route("/dashboard", get(dashboard::dashboard))
        // Attach state
        .with_state(state)
}

pub use attempts::*;
pub use dashboard::*;
pub use health::*;
pub use problems::*;
pub use reviews::*;
