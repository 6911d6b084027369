use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Best-effort geolocation of a visitor; any field may be empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct GeoInfo {
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub region: String,
    pub ip: String,
}

/// Structured fields parsed from a User-Agent header; empty when unknown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct UserAgentInfo {
    pub browser: String,
    pub os: String,
}

/// One successful redirect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VisitRecord {
    pub short_code: String,
    #[sqlx(flatten)]
    pub geo: GeoInfo,
    /// Empty for direct or unknown traffic
    pub referer: String,
    #[sqlx(flatten)]
    pub user_agent: UserAgentInfo,
    /// Unix timestamp in milliseconds
    pub occurred_at: i64,
}
