use crate::models::{NewUrl, ShortenedUrl, UrlSummary, VisitRecord};
use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("record not found")]
    NotFound,
    #[error("short code or manage code already exists")]
    Conflict,
    #[error("storage call timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StorageError::NotFound,
            sqlx::Error::Database(ref db) if db.is_unique_violation() => StorageError::Conflict,
            other => StorageError::Other(other.into()),
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Run a storage future under a fixed deadline, independent of the caller's lifetime
pub(crate) async fn bounded<T, F>(timeout: Duration, fut: F) -> StorageResult<T>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(StorageError::from),
        Err(_) => Err(StorageError::Timeout(timeout)),
    }
}

/// Persistence of shortened URL records
#[async_trait]
pub trait UrlStore: Send + Sync {
    /// Insert a new record. Fails with `Conflict` if either code is taken.
    async fn create(&self, url: &NewUrl) -> StorageResult<ShortenedUrl>;

    /// Look up a record by its public redirect code
    async fn get_by_short_code(&self, short_code: &str) -> StorageResult<ShortenedUrl>;

    /// Look up a record by its private manage code
    async fn get_by_manage_code(&self, manage_code: &str) -> StorageResult<ShortenedUrl>;

    /// Atomically delete the record matching both the manage code and the owning session.
    ///
    /// A wrong owner and a missing record both yield `NotFound`.
    async fn delete(&self, manage_code: &str, session_id: &str) -> StorageResult<ShortenedUrl>;

    /// Newest-first links owned by a session, each with its visit count
    async fn list_by_session(&self, session_id: &str, limit: i64)
        -> StorageResult<Vec<UrlSummary>>;

    /// All records carrying a non-zero lifetime (candidates for expiry sweeps)
    async fn list_expirable(&self) -> StorageResult<Vec<ShortenedUrl>>;
}

/// Persistence of raw visit events
#[async_trait]
pub trait VisitStore: Send + Sync {
    /// Insert a visit for a live link. Fails with `NotFound` once the link is gone,
    /// so a delete's cascade cannot be outrun by a late capture.
    async fn record_visit(&self, visit: &VisitRecord) -> StorageResult<()>;

    /// Remove every visit for a code. Removing nothing is not an error.
    async fn delete_all_for(&self, short_code: &str) -> StorageResult<u64>;

    /// Every visit for a code, in no particular order
    async fn get_all_for(&self, short_code: &str) -> StorageResult<Vec<VisitRecord>>;

    /// Number of visits recorded for a code
    async fn count_for(&self, short_code: &str) -> StorageResult<i64>;

    /// The most recent visits for a code, newest first
    async fn get_recent_for(&self, short_code: &str, limit: i64)
        -> StorageResult<Vec<VisitRecord>>;
}

#[async_trait]
pub trait Storage: UrlStore + VisitStore {
    /// Initialize the storage (create tables and indexes)
    async fn init(&self) -> Result<()>;
}
