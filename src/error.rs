//! Error taxonomy for the resilience core.
//!
//! The pure policies (`scoring`, `operation_risk`) never return `Result` —
//! they clamp inputs and document zero-contribution defaults instead. This
//! enum is for the store ports and the campaign orchestrator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid state transition: {0}")]
    InvalidState(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store temporarily unavailable: {0}")]
    StoreTransient(String),

    #[error("store error: {0}")]
    StoreFatal(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("executor timed out for asset {0}")]
    ExecutorTimeout(String),

    #[error("executor error for asset {0}: {1}")]
    ExecutorError(String, String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Whether a caller may retry the operation as-is.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::StoreTransient(_))
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for CoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                CoreError::StoreTransient(err.to_string())
            }
            _ => CoreError::StoreFatal(err.to_string()),
        }
    }
}
