//! Per-problem review schedule state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scheduler::ScheduleUpdate;

/// Lifecycle of a persisted schedule. A problem with no `ORIGINAL`
/// attempt yet has no schedule at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Active,
    /// Terminal. Never produced by the engine, but honored when set externally.
    Retired,
}

/// Review schedule for a single problem (1:1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSchedule {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub user_id: String,
    /// Always positive.
    pub current_interval_days: u32,
    pub next_review_date: NaiveDate,
    /// Unset until the first review.
    pub last_review_date: Option<NaiveDate>,
    pub active: bool,
    /// Bumped on every write; guards the read-modify-write cycle.
    pub version: i64,
}

impl ReviewSchedule {
    /// Seed a schedule from the engine's initial state.
    pub fn seeded(problem_id: Uuid, user_id: impl Into<String>, initial: ScheduleUpdate) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id,
            user_id: user_id.into(),
            current_interval_days: initial.interval_days,
            next_review_date: initial.next_review_date,
            last_review_date: None,
            active: true,
            version: 0,
        }
    }

    /// Due iff active and `next_review_date <= as_of`.
    pub fn is_due(&self, as_of: NaiveDate) -> bool {
        self.active && self.next_review_date <= as_of
    }

    pub fn lifecycle(&self) -> LifecycleState {
        if self.active {
            LifecycleState::Active
        } else {
            LifecycleState::Retired
        }
    }

    /// Apply an engine update reviewed on `reviewed_on`.
    pub fn apply(&mut self, update: ScheduleUpdate, reviewed_on: NaiveDate) {
        self.current_interval_days = update.interval_days;
        self.next_review_date = update.next_review_date;
        self.last_review_date = Some(reviewed_on);
    }
}
