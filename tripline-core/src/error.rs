use crate::token::InvalidationReason;
use crate::trip::TripStatus;

/// Failure talking to the durable record store. The only error class the
/// coordinator does not recover into a typed result; it propagates as an
/// internal failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt record: {0}")]
    Decode(String),
}

impl StoreError {
    pub fn database(err: impl std::fmt::Display) -> Self {
        StoreError::Database(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        StoreError::Decode(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification dispatch failed: {0}")]
    Dispatch(String),
}

/// The workflow error taxonomy. Everything here is recovered at the
/// coordinator boundary and mapped to a typed response at the API edge;
/// token-flow variants each carry a distinct user-facing message.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Missing or invalid credentials")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: TripStatus, to: TripStatus },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("This link has expired. Please ask the trip owner to send a new one.")]
    TokenExpired,

    #[error("This link has already been used.")]
    TokenUsed,

    #[error("{}", .0.user_message())]
    TokenInvalidated(InvalidationReason),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Concurrent update: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
