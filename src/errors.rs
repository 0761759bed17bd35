//! Error types for grant lifecycle operations
//!
//! Every lifecycle method returns `Result<T, GrantError>`. Any error aborts the
//! enclosing unit of work before it is committed, so a failed transition never
//! leaves partial state behind.

use thiserror::Error;

/// Result type alias for grant operations
pub type Result<T> = std::result::Result<T, GrantError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    /// Operation attempted from a status/stage that does not permit it
    #[error("{entity} is {current}, expected {expected}")]
    InvalidState {
        entity: String,
        current: String,
        expected: String,
    },

    /// Field-level validation failure (lengths, amounts, dates, reasons)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Referenced child entity is absent under its parent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Aggregate invariant broken after a batch mutation
    #[error("Integrity violation: {0}")]
    Integrity(String),

    /// Stale aggregate version at commit time
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl GrantError {
    pub fn invalid_state(
        entity: impl Into<String>,
        current: impl std::fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        GrantError::InvalidState {
            entity: entity.into(),
            current: current.to_string(),
            expected: expected.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        GrantError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        GrantError::NotFound(message.into())
    }

    /// Get the error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            GrantError::InvalidState { .. } => "INVALID_STATE",
            GrantError::Validation(_) => "VALIDATION",
            GrantError::NotFound(_) => "NOT_FOUND",
            GrantError::Integrity(_) => "INTEGRITY",
            GrantError::Conflict(_) => "CONFLICT",
            GrantError::Storage(_) => "STORAGE",
        }
    }

    /// Whether the caller can fix the request and retry.
    ///
    /// Integrity and storage failures point at a programming or infrastructure
    /// fault and are fatal to the request.
    pub fn is_user_correctable(&self) -> bool {
        !matches!(self, GrantError::Integrity(_) | GrantError::Storage(_))
    }
}
