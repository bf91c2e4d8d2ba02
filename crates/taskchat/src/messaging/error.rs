//! Messaging errors.

use thiserror::Error;

/// Errors raised by thread and message operations.
#[derive(Debug, Error)]
pub enum MessagingError {
    /// Body missing, empty, or whitespace only.
    #[error("Message body is required")]
    EmptyBody,

    #[error("Message body must be at most {max} characters")]
    BodyTooLong { max: usize },

    #[error("Thread {0} not found")]
    ThreadNotFound(i64),

    /// Requester is not a member of the thread.
    #[error("Not a participant of thread {0}")]
    NotParticipant(i64),

    #[error("Task {0} not found")]
    TaskNotFound(i64),

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("A thread needs at least one participant")]
    NoParticipants,

    /// Anything that went wrong reaching the database.
    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl MessagingError {
    /// Whether the failure came from the store rather than the caller.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
