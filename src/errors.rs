//! Resource Store Error Hierarchy
//!
//! Every layer owns one error enum. The top level [`Error`] wraps them and is
//! converted into the structured [`ErrorResult`] carried by every response.

use config::ConfigError;
use tokio::task::JoinError;

use crate::proto::ErrorResult;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Store configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Failures reported by the storage backend
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Identity and authorization failures
    #[error(transparent)]
    Access(#[from] AccessError),

    /// Watch fan-out failures
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),

    /// Request rejected by validation, already in its wire shape
    #[error("{0}")]
    Validation(ErrorResult),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// The stored version moved between read and write
    #[error("optimistic locking failed")]
    OptimisticLockFailed,

    #[error("Backend failure: {0}")]
    Backend(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("no identity found for request")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    /// The authorizer itself failed; distinct from a denial
    #[error("Authorization check failed: {0}")]
    Evaluation(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    /// End of stream: the broadcaster will never deliver again
    #[error("broadcaster terminated")]
    Terminated,

    #[error("operation cancelled")]
    Cancelled,

    #[error("subscriber can not keep up with replay")]
    SlowSubscriber,

    #[error("replay cache closed")]
    CacheClosed,

    #[error("Upstream connect failed: {0}")]
    Connect(String),

    #[error("broadcaster already started")]
    AlreadyStarted,
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Storage(StorageError::Serialization(e))
    }
}

impl From<ErrorResult> for Error {
    fn from(e: ErrorResult) -> Self {
        Error::Validation(e)
    }
}

impl From<JoinError> for Error {
    fn from(err: JoinError) -> Self {
        Error::Fatal(format!("Background task failed: {err}"))
    }
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Storage(StorageError::NotFound(_)))
    }
}

// ===== Wire conversions =====

impl From<&Error> for ErrorResult {
    fn from(err: &Error) -> Self {
        match err {
            Error::Validation(result) => result.clone(),
            Error::Storage(StorageError::NotFound(msg)) => ErrorResult::not_found(msg.clone()),
            Error::Storage(StorageError::AlreadyExists(msg)) => ErrorResult::already_exists(msg.clone()),
            Error::Storage(StorageError::OptimisticLockFailed) => ErrorResult::optimistic_locking_failed(),
            Error::Storage(StorageError::Serialization(e)) => ErrorResult::bad_request(e.to_string()),
            Error::Access(AccessError::Unauthenticated) => ErrorResult::unauthorized(err.to_string()),
            Error::Access(AccessError::Forbidden(msg)) => ErrorResult::forbidden(msg.clone()),
            _ => ErrorResult::internal(err.to_string()),
        }
    }
}

impl From<Error> for ErrorResult {
    fn from(err: Error) -> Self {
        ErrorResult::from(&err)
    }
}

impl From<Error> for tonic::Status {
    fn from(err: Error) -> Self {
        ErrorResult::from(&err).into()
    }
}
