use thiserror::Error;

use crate::session::SessionId;

/// Errors from store operations (used by trait definitions in coffeemate-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    /// Lock or busy contention on the single writer. Safe to retry.
    #[error("store busy: {0}")]
    Busy(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Whether the failure is transient contention rather than a real fault.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Busy(_))
    }
}

/// Errors surfaced by the session lifecycle operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("store still busy after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("signup window of {0} puts the deadline out of range")]
    WindowOutOfRange(chrono::TimeDelta),
}

impl From<RepositoryError> for SessionError {
    fn from(e: RepositoryError) -> Self {
        SessionError::StorageError(e.to_string())
    }
}

/// Errors from the outbound messaging transport.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("transport closed")]
    Closed,

    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Errors related to configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid daily time '{0}', expected HH:MM (00:00-23:59)")]
    InvalidDailyTime(String),

    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}
