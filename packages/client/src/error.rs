//! Error types for the dashboard client.

use arrboard_server::domain::ValueObjectError;
use thiserror::Error;

/// Failures talking to the REST backend
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// Network or protocol failure before a response arrived
    #[error("request failed: {0}")]
    Transport(String),

    #[error("not signed in")]
    Unauthorized,

    /// Non-success status; `message` is the server's error body when present
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Unauthorized => Some(401),
            GatewayError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failures of user-initiated feed actions (send, delete)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("{0}")]
    InvalidContent(#[from] ValueObjectError),

    #[error("you can only delete your own messages")]
    Forbidden,

    #[error("message '{0}' not found")]
    NotFound(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Realtime transport errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RealtimeError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("realtime client is closed")]
    Closed,
}

/// Errors raised by a video player adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VideoError {
    #[error("no player is active")]
    NoPlayer,

    #[error("player error: {0}")]
    Player(String),
}

/// Alert sound failures; always contained by the caller
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AudioError {
    #[error("audio unavailable: {0}")]
    Unavailable(String),
}

/// Client-specific errors surfaced by the binary
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error("Input error: {0}")]
    Input(String),
}

impl From<RealtimeError> for ClientError {
    fn from(err: RealtimeError) -> Self {
        ClientError::ConnectionError(err.to_string())
    }
}

/// Run a listener, containing any panic so the caller's loop keeps going
pub(crate) fn contain_panic(context: &str, f: impl FnOnce()) -> bool {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(_) => {
            tracing::error!("{} panicked; continuing", context);
            false
        }
    }
}
