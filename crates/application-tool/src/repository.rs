use chrono::{DateTime, Utc};

/// Error enumeration for persistence failures shared by every store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    /// The store moved on since the caller's read; the transaction must be retried.
    #[error("serialization conflict; transaction aborted")]
    SerializationConflict,
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Conflicts a fresh read-and-retry can resolve.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RepositoryError::SerializationConflict | RepositoryError::Constraint(_)
        )
    }
}

/// Wall-clock source for answer metadata, injectable so tests can pin time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
