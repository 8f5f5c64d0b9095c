//! Attempt log records.
//!
//! Attempts are append-only. Each problem has exactly one `ORIGINAL` attempt,
//! followed by any number of `REVIEW` attempts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::error::{RetainError, RetainResult};

/// Whether an attempt is the first solve or a later review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptType {
    Original,
    Review,
}

/// Retention verdict for a review attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MemoryRating {
    /// Logic is correct and matches the original approach.
    Remembered,
    /// Core idea recalled, details missing.
    Partial,
    /// Wrong or stuck.
    Forgot,
}

impl MemoryRating {
    /// Ratings that put a problem on the weak list.
    pub fn is_weak(self) -> bool {
        matches!(self, MemoryRating::Partial | MemoryRating::Forgot)
    }
}

/// An immutable solve attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub user_id: String,
    pub attempt_type: AttemptType,
    pub approach_text: String,
    pub code: Option<String>,
    pub language: Option<String>,
    pub feedback_summary: Option<String>,
    pub memory_rating: Option<MemoryRating>,
    pub created_at: DateTime<Utc>,
}

impl Attempt {
    /// Build the `ORIGINAL` attempt for a freshly submitted problem.
    pub fn original(
        problem_id: Uuid,
        user_id: impl Into<String>,
        approach_text: impl Into<String>,
        code: Option<String>,
        language: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id,
            user_id: user_id.into(),
            attempt_type: AttemptType::Original,
            approach_text: approach_text.into(),
            code,
            language,
            feedback_summary: None,
            memory_rating: None,
            created_at: Utc::now(),
        }
    }

    /// Build a `REVIEW` attempt carrying its verdict.
    pub fn review(
        problem_id: Uuid,
        user_id: impl Into<String>,
        submission: ReviewSubmission,
        feedback_summary: Option<String>,
        memory_rating: Option<MemoryRating>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id,
            user_id: user_id.into(),
            attempt_type: AttemptType::Review,
            approach_text: submission.approach_text,
            code: submission.code,
            language: submission.language,
            feedback_summary,
            memory_rating,
            created_at: Utc::now(),
        }
    }

    pub fn is_original(&self) -> bool {
        self.attempt_type == AttemptType::Original
    }
}

/// Input for a review attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub approach_text: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

impl ReviewSubmission {
    pub fn new(approach_text: impl Into<String>) -> Self {
        Self {
            approach_text: approach_text.into(),
            code: None,
            language: None,
        }
    }

    /// Builder: attach code and its language.
    pub fn with_code(mut self, code: impl Into<String>, language: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self.language = Some(language.into());
        self
    }

    pub fn validate(&self) -> RetainResult<()> {
        if self.approach_text.trim().is_empty() {
            return Err(RetainError::missing_field("approach_text"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_rating_string_forms() {
        assert_eq!(MemoryRating::Remembered.to_string(), "REMEMBERED");
        assert_eq!(MemoryRating::from_str("PARTIAL").unwrap(), MemoryRating::Partial);
        assert!(MemoryRating::from_str("MAYBE").is_err());
        assert_eq!(
            serde_json::to_string(&MemoryRating::Forgot).unwrap(),
            "\"FORGOT\""
        );
    }

    #[test]
    fn test_attempt_type_string_forms() {
        assert_eq!(AttemptType::Original.to_string(), "ORIGINAL");
        assert_eq!(AttemptType::from_str("REVIEW").unwrap(), AttemptType::Review);
    }

    #[test]
    fn test_weak_ratings() {
        assert!(!MemoryRating::Remembered.is_weak());
        assert!(MemoryRating::Partial.is_weak());
        assert!(MemoryRating::Forgot.is_weak());
    }

    #[test]
    fn test_review_attempt_carries_submission() {
        let problem_id = Uuid::new_v4();
        let submission = ReviewSubmission::new("sliding window").with_code("fn f() {}", "rust");
        let attempt = Attempt::review(
            problem_id,
            "u1",
            submission,
            Some("Good recall.".to_string()),
            Some(MemoryRating::Remembered),
        );

        assert_eq!(attempt.attempt_type, AttemptType::Review);
        assert_eq!(attempt.problem_id, problem_id);
        assert_eq!(attempt.language.as_deref(), Some("rust"));
        assert!(!attempt.is_original());
    }

    #[test]
    fn test_review_submission_requires_approach() {
        assert!(ReviewSubmission::new("   ").validate().is_err());
        assert!(ReviewSubmission::new("dfs").validate().is_ok());
    }
}
