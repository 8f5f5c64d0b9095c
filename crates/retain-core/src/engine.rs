//! Review lifecycle service.
//!
//! [`ReviewEngine`] ties the repository, the memory classifier and the
//! scheduler together. It is the only entry point the surrounding
//! application needs; schedule state is never mutated outside of it.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::classifier::{ComparisonRequest, FallbackReason, MemoryClassifier};
use crate::error::{ErrorCode, ResourceKind, RetainError, RetainResult};
use crate::scheduler::{ReviewScheduler, ScheduleUpdate};
use crate::store::ReviewRepository;
use crate::types::{
    Attempt, AttemptType, LifecycleState, MemoryRating, NewProblem, Problem, ReviewSchedule,
    ReviewSubmission,
};

/// Outcome of a problem submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubmissionResult {
    /// First time this reference was seen for the user.
    Created {
        problem: Problem,
        original: Attempt,
        schedule: ReviewSchedule,
    },
    /// The reference already existed; an unjudged `REVIEW` attempt was logged.
    Relogged {
        problem: Problem,
        attempt: Attempt,
        schedule: ReviewSchedule,
    },
}

impl SubmissionResult {
    pub fn problem(&self) -> &Problem {
        match self {
            SubmissionResult::Created { problem, .. } | SubmissionResult::Relogged { problem, .. } => {
                problem
            }
        }
    }

    pub fn schedule(&self) -> &ReviewSchedule {
        match self {
            SubmissionResult::Created { schedule, .. }
            | SubmissionResult::Relogged { schedule, .. } => schedule,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SubmissionResult::Created { .. })
    }
}

/// Outcome of a judged review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    pub attempt: Attempt,
    pub schedule: ReviewSchedule,
    /// Whether this rating puts the problem on the weak list.
    pub weak: bool,
    /// Set when the classifier could not judge and `FORGOT` was recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackReason>,
}

/// A problem due for review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueProblem {
    pub problem: Problem,
    pub schedule: ReviewSchedule,
}

/// A review attempt shown next to the original it is compared against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptView {
    pub attempt: Attempt,
    pub problem: Problem,
    pub original: Attempt,
}

/// Per-user overview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_problems: usize,
    pub total_attempts: usize,
    pub due_count: usize,
    pub weak_problems: Vec<Problem>,
}

/// Review lifecycle service.
pub struct ReviewEngine {
    repo: Arc<dyn ReviewRepository>,
    classifier: Arc<dyn MemoryClassifier>,
    scheduler: ReviewScheduler,
}

impl ReviewEngine {
    /// Create an engine on the system clock.
    pub fn new(repo: Arc<dyn ReviewRepository>, classifier: Arc<dyn MemoryClassifier>) -> Self {
        Self::with_scheduler(repo, classifier, ReviewScheduler::new())
    }

    pub fn with_scheduler(
        repo: Arc<dyn ReviewRepository>,
        classifier: Arc<dyn MemoryClassifier>,
        scheduler: ReviewScheduler,
    ) -> Self {
        Self {
            repo,
            classifier,
            scheduler,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.scheduler.today()
    }

    /// Submit a solved problem.
    ///
    /// The first submission of a reference creates the problem, its
    /// `ORIGINAL` attempt and its schedule. Any later submission of the same
    /// reference is a re-log: a `REVIEW` attempt rated `REMEMBERED` without
    /// consulting the classifier.
    #[instrument(skip(self, new), fields(external_ref = %new.external_ref))]
    pub async fn create_problem(
        &self,
        user_id: &str,
        new: NewProblem,
    ) -> RetainResult<SubmissionResult> {
        new.validate()?;

        if let Some(problem) = self.repo.find_problem_by_ref(user_id, &new.external_ref).await? {
            return self.relog(user_id, problem, new).await;
        }

        let now = Utc::now();
        let problem = Problem {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            external_ref: new.external_ref,
            title: new.title,
            difficulty: new.difficulty,
            tags: new.tags,
            description: new.description,
            first_solved_at: now,
            created_at: now,
        };
        let original = Attempt::original(problem.id, user_id, new.approach_text, new.code, new.language);
        let schedule = ReviewSchedule::seeded(problem.id, user_id, self.scheduler.initial_schedule()?);

        self.repo
            .create_problem_with_original(&problem, &original, &schedule)
            .await?;

        info!(
            problem_id = %problem.id,
            user_id,
            interval_days = schedule.current_interval_days,
            next_review_date = %schedule.next_review_date,
            "Problem created"
        );

        Ok(SubmissionResult::Created {
            problem,
            original,
            schedule,
        })
    }

    async fn relog(
        &self,
        user_id: &str,
        problem: Problem,
        new: NewProblem,
    ) -> RetainResult<SubmissionResult> {
        warn!(
            problem_id = %problem.id,
            user_id,
            "Re-logged solve advances the schedule as REMEMBERED without a judged review"
        );

        let submission = ReviewSubmission {
            approach_text: new.approach_text,
            code: new.code,
            language: new.language,
        };
        let attempt = Attempt::review(
            problem.id,
            user_id,
            submission,
            None,
            Some(MemoryRating::Remembered),
        );

        let today = self.today();
        let schedule = self
            .repo
            .record_review(&attempt, &advance_active(MemoryRating::Remembered, today), today)
            .await?;

        Ok(SubmissionResult::Relogged {
            problem,
            attempt,
            schedule,
        })
    }

    /// Submit a judged review of a problem.
    ///
    /// Always completes with a rating and a next due date: a classifier
    /// failure is recorded as `FORGOT` and reported in
    /// [`ReviewResult::fallback`].
    #[instrument(skip(self, submission))]
    pub async fn submit_review(
        &self,
        user_id: &str,
        problem_id: Uuid,
        submission: ReviewSubmission,
    ) -> RetainResult<ReviewResult> {
        submission.validate()?;

        let problem = self.get_problem(user_id, problem_id).await?;
        let original = self.original_attempt(user_id, problem_id).await?;

        let request = ComparisonRequest::from_records(&problem, &original, &submission);
        let outcome = self.classifier.compare(&request).await;
        let fallback = outcome.fallback_reason().cloned();
        if let Some(reason) = &fallback {
            warn!(%problem_id, user_id, %reason, "Recording review as FORGOT after classifier fallback");
        }

        let judgment = outcome.judgment();
        let attempt = Attempt::review(
            problem_id,
            user_id,
            submission,
            Some(judgment.summary),
            Some(judgment.rating),
        );

        let today = self.today();
        let schedule = self
            .repo
            .record_review(&attempt, &advance_active(judgment.rating, today), today)
            .await?;

        info!(
            %problem_id,
            user_id,
            rating = %judgment.rating,
            interval_days = schedule.current_interval_days,
            next_review_date = %schedule.next_review_date,
            "Review recorded"
        );

        Ok(ReviewResult {
            attempt,
            schedule,
            weak: judgment.rating.is_weak(),
            fallback,
        })
    }

    /// Problems due on or before `as_of` (default: today).
    pub async fn list_due(
        &self,
        user_id: &str,
        as_of: Option<NaiveDate>,
    ) -> RetainResult<Vec<DueProblem>> {
        let as_of = as_of.unwrap_or_else(|| self.today());
        let due = self.repo.list_due(user_id, as_of).await?;
        Ok(due
            .into_iter()
            .map(|(problem, schedule)| DueProblem { problem, schedule })
            .collect())
    }

    /// Problems whose latest review was rated `PARTIAL` or `FORGOT`.
    pub async fn list_weak(&self, user_id: &str) -> RetainResult<Vec<Problem>> {
        self.repo.list_weak(user_id).await
    }

    pub async fn get_problem(&self, user_id: &str, problem_id: Uuid) -> RetainResult<Problem> {
        self.repo
            .find_problem(user_id, problem_id)
            .await?
            .ok_or_else(|| RetainError::not_found(ResourceKind::Problem, problem_id.to_string()))
    }

    pub async fn list_problems(&self, user_id: &str) -> RetainResult<Vec<Problem>> {
        self.repo.list_problems(user_id).await
    }

    /// The review schedule of a problem.
    pub async fn get_schedule(&self, user_id: &str, problem_id: Uuid) -> RetainResult<ReviewSchedule> {
        self.repo
            .find_schedule(user_id, problem_id)
            .await?
            .ok_or_else(|| RetainError::not_found(ResourceKind::Schedule, problem_id.to_string()))
    }

    /// Every attempt on a problem, oldest first.
    pub async fn problem_history(&self, user_id: &str, problem_id: Uuid) -> RetainResult<Vec<Attempt>> {
        self.get_problem(user_id, problem_id).await?;
        self.repo.list_attempts(user_id, problem_id).await
    }

    /// An attempt together with its problem and the `ORIGINAL` attempt.
    pub async fn get_attempt_with_original(
        &self,
        user_id: &str,
        attempt_id: Uuid,
    ) -> RetainResult<AttemptView> {
        let attempt = self
            .repo
            .find_attempt(user_id, attempt_id)
            .await?
            .ok_or_else(|| RetainError::not_found(ResourceKind::Attempt, attempt_id.to_string()))?;
        let problem = self.get_problem(user_id, attempt.problem_id).await?;
        let original = self.original_attempt(user_id, attempt.problem_id).await?;

        Ok(AttemptView {
            attempt,
            problem,
            original,
        })
    }

    pub async fn dashboard(&self, user_id: &str) -> RetainResult<DashboardStats> {
        let stats = self.repo.stats(user_id).await?;
        let due_count = self.repo.list_due(user_id, self.today()).await?.len();
        let weak_problems = self.repo.list_weak(user_id).await?;

        Ok(DashboardStats {
            total_problems: stats.total_problems,
            total_attempts: stats.total_attempts,
            due_count,
            weak_problems,
        })
    }

    async fn original_attempt(&self, user_id: &str, problem_id: Uuid) -> RetainResult<Attempt> {
        self.repo
            .latest_attempt(user_id, problem_id, AttemptType::Original)
            .await?
            .ok_or_else(|| {
                tracing::error!(%problem_id, "Problem has no ORIGINAL attempt");
                RetainError::invariant(
                    ErrorCode::InvMissingOriginal,
                    format!("problem '{}' has no original attempt", problem_id),
                )
            })
    }
}

/// Schedule transition for a rating. Retired schedules are left as they are.
fn advance_active(
    rating: MemoryRating,
    today: NaiveDate,
) -> impl Fn(&ReviewSchedule) -> RetainResult<Option<ScheduleUpdate>> + Send + Sync {
    move |current| {
        if current.lifecycle() == LifecycleState::Retired {
            info!(problem_id = %current.problem_id, "Schedule is retired; attempt logged without advancing");
            return Ok(None);
        }
        ReviewScheduler::advance_on(current.current_interval_days, Some(rating), today).map(Some)
    }
}
