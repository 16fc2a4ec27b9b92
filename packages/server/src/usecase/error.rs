//! UseCase error types.

use thiserror::Error;

use crate::domain::{RepositoryError, ValueObjectError};

/// Generic failure of a read/write use case
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UseCaseError {
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Failures of `PostMessageUseCase`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PostMessageError {
    #[error("{0}")]
    InvalidContent(#[from] ValueObjectError),

    #[error("failed to send message: {0}")]
    Repository(#[from] RepositoryError),
}

/// Failures of `DeleteMessageUseCase`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeleteMessageError {
    #[error("message not found")]
    NotFound,

    #[error("forbidden")]
    Forbidden,

    #[error("failed to delete message: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for DeleteMessageError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::MessageNotFound(_) => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}
