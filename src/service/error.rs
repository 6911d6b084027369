use thiserror::Error;

use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed input: bad URL, negative lifetime, missing session
    #[error("{0}")]
    Validation(String),
    /// Unknown code, or a delete attempted by a session that does not own the link.
    /// Callers cannot tell the two apart.
    #[error("link not found")]
    NotFound,
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => ServiceError::NotFound,
            other => ServiceError::Storage(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
