use crate::models::OrderStatus;
use tuma_core::repository::RepoError;

/// Typed failure taxonomy for lifecycle operations. Validation,
/// authorization and state conflicts are detected before any mutation;
/// storage failures roll the operation back.
#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("{0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl OrderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn authorization(msg: impl Into<String>) -> Self {
        Self::Authorization(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn storage(err: RepoError) -> Self {
        Self::Storage(err.to_string())
    }
}
