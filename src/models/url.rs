use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShortenedUrl {
    pub id: i64,
    pub short_code: String,
    pub manage_code: String,
    pub original_url: String,
    /// Owning session, only ever compared on delete
    #[serde(skip_serializing)]
    pub session_id: String,
    pub delete_after_minutes: Option<i64>,
    /// Unix timestamp in milliseconds
    pub created_at: i64,
}

impl ShortenedUrl {
    pub fn created_at_time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.created_at).unwrap_or_default()
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.created_at_time(), self.delete_after_minutes, now)
    }
}

/// A URL record that has not been persisted yet
#[derive(Debug, Clone)]
pub struct NewUrl {
    pub short_code: String,
    pub manage_code: String,
    pub original_url: String,
    pub session_id: String,
    pub delete_after_minutes: Option<i64>,
    pub created_at: i64,
}

/// Row returned when listing a session's links
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UrlSummary {
    pub short_code: String,
    pub manage_code: String,
    pub original_url: String,
    pub delete_after_minutes: Option<i64>,
    pub created_at: i64,
    pub total_visits: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateUrlRequest {
    pub url: String,
    /// Minutes after creation when the link expires; 0 or absent keeps it forever
    pub delete_after: Option<i64>,
}

/// Decide whether a link created at `created_at` has outlived its lifetime at `now`.
///
/// A missing or zero lifetime never expires. The boundary instant itself is
/// still considered live.
pub fn is_expired(
    created_at: DateTime<Utc>,
    delete_after_minutes: Option<i64>,
    now: DateTime<Utc>,
) -> bool {
    let minutes = match delete_after_minutes {
        Some(m) if m > 0 => m,
        _ => return false,
    };

    // A lifetime too large to represent can never elapse
    match TimeDelta::try_minutes(minutes).and_then(|d| created_at.checked_add_signed(d)) {
        Some(deadline) => now > deadline,
        None => false,
    }
}
