//! retain-core - Core library for retain.
//!
//! This crate provides the spaced-repetition scheduling engine, the review
//! lifecycle service, the memory classifier port and the SQLite-backed
//! repository used to keep solved problems fresh.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use retain_core::{LlmClassifier, NewProblem, ReviewEngine, ReviewSubmission, SqliteStore};
//!
//! let store = Arc::new(SqliteStore::new("retain.db")?);
//! let engine = ReviewEngine::new(store, Arc::new(LlmClassifier::unconfigured("Gemini")));
//!
//! // First submission seeds the schedule five days out
//! let created = engine.create_problem("user1", problem).await?;
//!
//! // Later, a judged review advances it
//! let result = engine
//!     .submit_review("user1", created.problem().id, ReviewSubmission::new("two pointers"))
//!     .await?;
//! ```

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod scheduler;
pub mod store;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use classifier::{
    ClassifierOutcome, ComparisonRequest, FallbackReason, Judgment, LlmClassifier, MemoryClassifier,
};
pub use config::{ClassifierConfig, LlmProvider, LlmProviderConfig, RetainConfig, RetryPolicy};
pub use engine::{
    AttemptView, DashboardStats, DueProblem, ReviewEngine, ReviewResult, SubmissionResult,
};
pub use error::{ErrorCode, ResourceKind, RetainError, RetainResult};
pub use scheduler::{
    latest_review_date, Clock, FixedClock, ReviewScheduler, ScheduleUpdate, SystemClock,
};
pub use store::{RepositoryStats, ReviewRepository, ScheduleTransition, SqliteStore};
pub use traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat, TokenUsage};
pub use types::{
    Attempt, AttemptType, Difficulty, LifecycleState, MemoryRating, Message, MessageRole,
    NewProblem, Problem, ReviewSchedule, ReviewSubmission,
};
