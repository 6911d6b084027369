//! Data models for analytics

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{ShortenedUrl, VisitRecord};

/// Visit counts keyed by a single dimension (country code, referer, browser).
///
/// Unordered; callers sort for presentation if they need to.
pub type FrequencyTable = HashMap<String, u64>;

/// The three per-dimension tables reduced from a set of visits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisitTables {
    pub countries: FrequencyTable,
    pub referers: FrequencyTable,
    pub browsers: FrequencyTable,
}

/// Summary of a link for its owner
#[derive(Debug, Clone, Serialize)]
pub struct UrlStats {
    pub url: ShortenedUrl,

    /// Number of visits ever recorded for the link
    pub total_visits: i64,

    /// Sample of the most recent visits the tables were computed from
    pub visits: Vec<VisitRecord>,

    #[serde(flatten)]
    pub tables: VisitTables,
}
