//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    infrastructure::dto::http::ErrorResponse,
    usecase::{DeleteMessageError, PostMessageError, UseCaseError},
};

/// Error returned by handlers as `{ "error": "..." }` with a status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<UseCaseError> for ApiError {
    fn from(error: UseCaseError) -> Self {
        tracing::error!("{}", error);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    }
}

impl From<PostMessageError> for ApiError {
    fn from(error: PostMessageError) -> Self {
        match error {
            PostMessageError::InvalidContent(e) => Self::new(StatusCode::BAD_REQUEST, e.to_string()),
            PostMessageError::Repository(e) => {
                tracing::error!("POST /api/messages error: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send message")
            }
        }
    }
}

impl From<DeleteMessageError> for ApiError {
    fn from(error: DeleteMessageError) -> Self {
        match error {
            DeleteMessageError::NotFound => Self::new(StatusCode::NOT_FOUND, "Message not found"),
            DeleteMessageError::Forbidden => Self::forbidden(),
            DeleteMessageError::Repository(e) => {
                tracing::error!("DELETE /api/messages error: {}", e);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete message")
            }
        }
    }
}
