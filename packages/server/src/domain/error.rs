//! Domain error types.

use thiserror::Error;

/// Validation errors raised when constructing value objects
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    EmptyUserId,

    #[error("content is required")]
    EmptyContent,

    #[error("content must be {max} characters or less (got {actual})")]
    ContentTooLong { max: usize, actual: usize },

    #[error("invalid message id: {0}")]
    InvalidMessageId(String),
}

/// Errors returned by repository implementations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("message '{0}' not found")]
    MessageNotFound(String),

    #[error("storage failure: {0}")]
    Storage(String),
}
