//! Persistence for problems, attempts and review schedules.
//!
//! The engine only talks to [`ReviewRepository`]. [`SqliteStore`] is the
//! shipped implementation.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RetainResult;
use crate::scheduler::ScheduleUpdate;
use crate::types::{Attempt, AttemptType, Problem, ReviewSchedule};

/// Computes the next schedule state from the one currently stored.
///
/// Called inside the write transaction, so the input is never stale.
/// Returning `None` leaves the schedule untouched.
pub type ScheduleTransition<'a> =
    dyn Fn(&ReviewSchedule) -> RetainResult<Option<ScheduleUpdate>> + Send + Sync + 'a;

/// Per-user counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub total_problems: usize,
    pub total_attempts: usize,
}

/// Storage operations the review engine relies on.
///
/// Every lookup is scoped to `user_id`; a record owned by another user is
/// reported as absent.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    async fn find_problem(&self, user_id: &str, problem_id: Uuid) -> RetainResult<Option<Problem>>;

    async fn find_problem_by_ref(
        &self,
        user_id: &str,
        external_ref: &str,
    ) -> RetainResult<Option<Problem>>;

    /// All problems for a user, oldest first.
    async fn list_problems(&self, user_id: &str) -> RetainResult<Vec<Problem>>;

    /// Insert a problem, its `ORIGINAL` attempt and its schedule atomically.
    async fn create_problem_with_original(
        &self,
        problem: &Problem,
        original: &Attempt,
        schedule: &ReviewSchedule,
    ) -> RetainResult<()>;

    async fn find_attempt(&self, user_id: &str, attempt_id: Uuid) -> RetainResult<Option<Attempt>>;

    /// Most recent attempt of the given type for a problem.
    async fn latest_attempt(
        &self,
        user_id: &str,
        problem_id: Uuid,
        attempt_type: AttemptType,
    ) -> RetainResult<Option<Attempt>>;

    /// Attempts for a problem in creation order.
    async fn list_attempts(&self, user_id: &str, problem_id: Uuid) -> RetainResult<Vec<Attempt>>;

    async fn find_schedule(
        &self,
        user_id: &str,
        problem_id: Uuid,
    ) -> RetainResult<Option<ReviewSchedule>>;

    /// Append a `REVIEW` attempt and advance the problem's schedule in one
    /// write transaction.
    ///
    /// The schedule row is re-read under the write lock and `transition`
    /// decides its new state. A missing schedule is an invariant violation.
    async fn record_review(
        &self,
        attempt: &Attempt,
        transition: &ScheduleTransition<'_>,
        reviewed_on: NaiveDate,
    ) -> RetainResult<ReviewSchedule>;

    /// Active schedules with `next_review_date <= as_of`, paired with their
    /// problems.
    async fn list_due(
        &self,
        user_id: &str,
        as_of: NaiveDate,
    ) -> RetainResult<Vec<(Problem, ReviewSchedule)>>;

    /// Problems whose latest `REVIEW` attempt is rated `PARTIAL` or `FORGOT`.
    async fn list_weak(&self, user_id: &str) -> RetainResult<Vec<Problem>>;

    async fn stats(&self, user_id: &str) -> RetainResult<RepositoryStats>;

    /// Retire or reactivate a schedule. Returns `false` if none was found.
    async fn set_schedule_active(
        &self,
        user_id: &str,
        problem_id: Uuid,
        active: bool,
    ) -> RetainResult<bool>;
}
