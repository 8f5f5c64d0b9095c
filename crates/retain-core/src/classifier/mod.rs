//! Memory classifier port.
//!
//! The classifier compares a learner's original solution with a fresh
//! attempt and returns a verdict. It is an external collaborator, so its
//! failures never escape this module: every call yields a
//! [`ClassifierOutcome`], which is either a real judgment or an explicit
//! fallback that callers must handle (the type is `#[must_use]`).

mod llm_classifier;
pub mod parse;
pub mod prompts;

pub use llm_classifier::LlmClassifier;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::{Attempt, MemoryRating, Problem, ReviewSubmission};

/// Summary recorded when the classifier failed to produce a verdict.
pub const ERROR_SUMMARY: &str = "Error analyzing attempt.";

/// Placeholder used when an attempt carries no code.
pub const NO_CODE: &str = "N/A";

/// Inputs to a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRequest {
    pub problem_description: String,
    pub original_approach: String,
    pub original_code: Option<String>,
    pub new_approach: String,
    pub new_code: Option<String>,
}

impl ComparisonRequest {
    /// Build a request from stored records and the incoming submission.
    pub fn from_records(problem: &Problem, original: &Attempt, submission: &ReviewSubmission) -> Self {
        Self {
            problem_description: problem.description.clone(),
            original_approach: original.approach_text.clone(),
            original_code: original.code.clone(),
            new_approach: submission.approach_text.clone(),
            new_code: submission.code.clone(),
        }
    }
}

/// A verdict on how well the solution was retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Judgment {
    pub summary: String,
    pub rating: MemoryRating,
}

/// Why the classifier could not produce a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    /// No service is configured (e.g. missing API key).
    NotConfigured { service: String },
    /// The call did not complete within the configured timeout.
    Timeout { after_ms: u64 },
    /// The service was unreachable or returned an error.
    Unavailable(String),
    /// The response was not the expected JSON shape.
    Malformed(String),
    /// The response named a rating outside the closed set.
    InvalidRating(String),
}

impl FallbackReason {
    /// Summary text recorded on the attempt for this fallback.
    pub fn summary(&self) -> String {
        match self {
            FallbackReason::NotConfigured { service } => format!("{} not configured.", service),
            _ => ERROR_SUMMARY.to_string(),
        }
    }

    /// Failures worth another try.
    pub fn is_transient(&self) -> bool {
        matches!(self, FallbackReason::Timeout { .. } | FallbackReason::Unavailable(_))
    }
}

impl std::fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotConfigured { service } => write!(f, "{} not configured", service),
            Self::Timeout { after_ms } => write!(f, "timed out after {}ms", after_ms),
            Self::Unavailable(msg) => write!(f, "service unavailable: {}", msg),
            Self::Malformed(msg) => write!(f, "malformed response: {}", msg),
            Self::InvalidRating(value) => write!(f, "invalid rating '{}'", value),
        }
    }
}

/// Result of a comparison: a judgment, or a fallback with its reason.
#[must_use = "a fallback outcome must be surfaced, not silently dropped"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifierOutcome {
    Judged(Judgment),
    Fallback(FallbackReason),
}

impl ClassifierOutcome {
    /// The verdict to record. A fallback is treated as `FORGOT`.
    pub fn judgment(&self) -> Judgment {
        match self {
            ClassifierOutcome::Judged(judgment) => judgment.clone(),
            ClassifierOutcome::Fallback(reason) => Judgment {
                summary: reason.summary(),
                rating: MemoryRating::Forgot,
            },
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            ClassifierOutcome::Fallback(reason) => Some(reason),
            ClassifierOutcome::Judged(_) => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ClassifierOutcome::Fallback(_))
    }
}

/// Port to the external memory classifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MemoryClassifier: Send + Sync {
    /// Compare an original attempt with a new one. Never fails; errors are
    /// reported as [`ClassifierOutcome::Fallback`].
    async fn compare(&self, request: &ComparisonRequest) -> ClassifierOutcome;
}
