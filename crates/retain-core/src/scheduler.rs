//! Interval scheduling engine.
//!
//! A deliberately small policy, not SM-2: no ease factor and no history
//! beyond the current interval.
//!
//! - `REMEMBERED` doubles the interval, floored at 10 days
//! - `PARTIAL` grows it by half (rounded down), floored at 7 days
//! - `FORGOT` or no rating resets to 5 days regardless of the current interval
//!
//! There is no policy clamp, so repeated `REMEMBERED` ratings keep growing
//! the interval until the next review would fall after [`latest_review_date`].
//! From there the interval is capped at the days left before that date.

use std::sync::Arc;

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorCode, RetainError, RetainResult};
use crate::types::MemoryRating;

/// Interval assigned when a problem is first submitted.
pub const INITIAL_INTERVAL_DAYS: u32 = 5;
/// Minimum interval after a `REMEMBERED` rating.
pub const REMEMBERED_FLOOR_DAYS: u32 = 10;
/// Minimum interval after a `PARTIAL` rating.
pub const PARTIAL_FLOOR_DAYS: u32 = 7;
/// Interval after `FORGOT` or a missing rating.
pub const RESET_INTERVAL_DAYS: u32 = 5;

/// Latest date a review can be scheduled for. Stored dates keep a four-digit
/// year so they sort correctly as text.
pub fn latest_review_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX)
}

/// Source of "today" for scheduling decisions.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, using the UTC calendar date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a fixed date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// New schedule state produced by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleUpdate {
    pub interval_days: u32,
    pub next_review_date: NaiveDate,
}

/// Pure interval scheduler.
///
/// Holds no mutable state, so one instance can be shared by any number of
/// concurrent callers.
#[derive(Clone)]
pub struct ReviewScheduler {
    clock: Arc<dyn Clock>,
}

impl ReviewScheduler {
    /// Create a scheduler on the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create a scheduler on a custom clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Today's date according to the scheduler's clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Schedule for a newly submitted problem: 5 days from today.
    pub fn initial_schedule(&self) -> RetainResult<ScheduleUpdate> {
        Self::initial_schedule_on(self.today())
    }

    /// Next schedule after a rating, evaluated against today.
    pub fn advance(
        &self,
        current_interval: u32,
        rating: Option<MemoryRating>,
    ) -> RetainResult<ScheduleUpdate> {
        Self::advance_on(current_interval, rating, self.today())
    }

    /// Schedule for a newly submitted problem, given today's date.
    pub fn initial_schedule_on(today: NaiveDate) -> RetainResult<ScheduleUpdate> {
        Ok(Self::schedule_from(INITIAL_INTERVAL_DAYS, today))
    }

    /// Next schedule after a rating, given today's date.
    ///
    /// A zero interval means the caller corrupted schedule state and is
    /// rejected as an invariant violation.
    pub fn advance_on(
        current_interval: u32,
        rating: Option<MemoryRating>,
        today: NaiveDate,
    ) -> RetainResult<ScheduleUpdate> {
        let interval = Self::next_interval(current_interval, rating)?;
        Ok(Self::schedule_from(interval, today))
    }

    /// Interval arithmetic only, without dates.
    pub fn next_interval(current_interval: u32, rating: Option<MemoryRating>) -> RetainResult<u32> {
        if current_interval == 0 {
            tracing::error!(
                rating = ?rating,
                "Scheduler received a non-positive interval"
            );
            return Err(RetainError::invariant(
                ErrorCode::InvNonPositiveInterval,
                "current interval must be a positive number of days",
            ));
        }

        let interval = match rating {
            Some(MemoryRating::Remembered) => {
                current_interval.saturating_mul(2).max(REMEMBERED_FLOOR_DAYS)
            }
            Some(MemoryRating::Partial) => current_interval
                .saturating_add(current_interval / 2)
                .max(PARTIAL_FLOOR_DAYS),
            Some(MemoryRating::Forgot) | None => RESET_INTERVAL_DAYS,
        };

        Ok(interval)
    }

    fn schedule_from(interval_days: u32, today: NaiveDate) -> ScheduleUpdate {
        // Never below one day, even when today is already the last date.
        let days_left = (latest_review_date() - today).num_days().max(1);
        let interval_days = interval_days.min(u32::try_from(days_left).unwrap_or(u32::MAX));
        let next_review_date = today
            .checked_add_days(Days::new(u64::from(interval_days)))
            .unwrap_or(NaiveDate::MAX);

        ScheduleUpdate {
            interval_days,
            next_review_date,
        }
    }
}

impl Default for ReviewScheduler {
    fn default() -> Self {
        Self::new()
    }
}
