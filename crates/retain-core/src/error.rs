//! Error types for retain operations.
//!
//! Errors carry a structured [`ErrorCode`] so the web layer can map them
//! without string matching. Classifier failures deliberately have no variant
//! here: the classifier port resolves them into a fallback outcome instead.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for retain operations.
pub type RetainResult<T> = Result<T, RetainError>;

/// Main error type for all retain operations.
#[derive(Error, Debug)]
pub enum RetainError {
    /// Input validation failed.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// A problem, attempt or schedule does not exist or belongs to another user.
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        resource_id: Option<String>,
    },

    /// A caller broke an engine invariant (missing schedule, non-positive interval).
    #[error("Invariant violation: {message}")]
    InvariantViolation { message: String, code: ErrorCode },

    /// LLM operation failed.
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider not supported.
    #[error("Provider not supported: {provider}")]
    UnsupportedProvider { provider: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValInvalidInput,
    ValMissingField,

    // Lookup (PRB_xxx / ATT_xxx / SCH_xxx)
    ProblemNotFound,
    AttemptNotFound,
    ScheduleNotFound,

    // Invariants (INV_xxx)
    InvMissingSchedule,
    InvMissingOriginal,
    InvNonPositiveInterval,
    InvStaleSchedule,

    // LLM (LLM_xxx)
    LlmGenerationFailed,
    LlmInvalidResponse,

    // Database (DB_xxx)
    DbOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValMissingField => "VAL_002",
            ErrorCode::ProblemNotFound => "PRB_001",
            ErrorCode::AttemptNotFound => "ATT_001",
            ErrorCode::ScheduleNotFound => "SCH_001",
            ErrorCode::InvMissingSchedule => "INV_001",
            ErrorCode::InvMissingOriginal => "INV_002",
            ErrorCode::InvNonPositiveInterval => "INV_003",
            ErrorCode::InvStaleSchedule => "INV_004",
            ErrorCode::LlmGenerationFailed => "LLM_001",
            ErrorCode::LlmInvalidResponse => "LLM_002",
            ErrorCode::DbOperationFailed => "DB_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

/// Kind of resource a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Problem,
    Attempt,
    Schedule,
}

impl ResourceKind {
    fn label(self) -> &'static str {
        match self {
            ResourceKind::Problem => "Problem",
            ResourceKind::Attempt => "Attempt",
            ResourceKind::Schedule => "Review schedule",
        }
    }

    fn code(self) -> ErrorCode {
        match self {
            ResourceKind::Problem => ErrorCode::ProblemNotFound,
            ResourceKind::Attempt => ErrorCode::AttemptNotFound,
            ResourceKind::Schedule => ErrorCode::ScheduleNotFound,
        }
    }
}

impl RetainError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error for a required field that was empty.
    pub fn missing_field(field: &str) -> Self {
        let mut details = HashMap::new();
        details.insert("field".to_string(), field.to_string());
        Self::Validation {
            message: format!("'{}' must not be empty", field),
            code: ErrorCode::ValMissingField,
            details,
            suggestion: Some(format!("Provide a non-empty '{}'", field)),
        }
    }

    /// Create a not found error.
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NotFound {
            message: format!("{} with id '{}' not found", kind.label(), id),
            code: kind.code(),
            resource_id: Some(id),
        }
    }

    /// Create an invariant violation error.
    pub fn invariant(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
            code,
        }
    }

    /// Create an LLM error.
    pub fn llm(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmGenerationFailed,
            source: None,
        }
    }

    /// Create an LLM error for a response body that could not be read.
    pub fn llm_response(message: impl Into<String>) -> Self {
        Self::Llm {
            message: message.into(),
            code: ErrorCode::LlmInvalidResponse,
            source: None,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotFound { code, .. } => *code,
            Self::InvariantViolation { code, .. } => *code,
            Self::Llm { code, .. } => *code,
            Self::Database { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this error indicates a caller bug rather than a runtime condition.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFound { .. } => Some("Please check the id and that it belongs to you"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Llm { .. } => Some("Please check your LLM provider configuration"),
            Self::Database { .. } => Some("Please check the database path and permissions"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for RetainError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
