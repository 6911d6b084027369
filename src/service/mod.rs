//! Link lifecycle: shortening, redirect-time expiry and visit capture,
//! owner-scoped listing and deletion, and the statistics read path.

pub mod error;

pub use error::{ServiceError, ServiceResult};

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::analytics::{self, GeoLookup, NoopGeoLookup, UrlStats, UserAgentParser};
use crate::codegen::CodeGenerator;
use crate::models::{NewUrl, ShortenedUrl, UrlSummary, VisitRecord};
use crate::storage::{Storage, StorageError};

/// How many times `shorten` redraws codes after a uniqueness conflict
pub const MAX_CODE_ATTEMPTS: usize = 3;

/// Upper bound for a single `list_mine` page
pub const MAX_LIST_LIMIT: i64 = 100;

/// Request metadata captured for a visit
#[derive(Debug, Clone)]
pub struct VisitContext {
    pub client_ip: IpAddr,
    /// Raw Referer header, empty when absent
    pub referer: String,
    /// Raw User-Agent header, empty when absent
    pub user_agent: String,
}

/// What the client should be told after resolving a short code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Live link: temporary redirect to the original URL
    Temporary(String),
    /// Link outlived its lifetime: permanent redirect to the service root
    ExpiredToRoot,
    NotFound,
}

pub struct LinkService {
    storage: Arc<dyn Storage>,
    codes: CodeGenerator,
    geo: Arc<dyn GeoLookup>,
    user_agents: Arc<UserAgentParser>,
    analytics_enabled: bool,
}

impl LinkService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            codes: CodeGenerator::new(),
            geo: Arc::new(NoopGeoLookup),
            user_agents: Arc::new(UserAgentParser::new()),
            analytics_enabled: true,
        }
    }

    pub fn with_code_generator(mut self, codes: CodeGenerator) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_geo_lookup(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.geo = geo;
        self
    }

    /// Disable visit capture entirely; redirects still resolve and expire
    pub fn with_analytics(mut self, enabled: bool) -> Self {
        self.analytics_enabled = enabled;
        self
    }

    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Create a link owned by `session_id`
    pub async fn shorten(
        &self,
        original_url: &str,
        delete_after_minutes: Option<i64>,
        session_id: &str,
    ) -> ServiceResult<ShortenedUrl> {
        if session_id.is_empty() {
            return Err(ServiceError::Validation("missing session".to_string()));
        }

        let delete_after_minutes = match delete_after_minutes {
            Some(m) if m < 0 => {
                return Err(ServiceError::Validation(
                    "delete_after must not be negative".to_string(),
                ))
            }
            Some(0) | None => None,
            Some(m) => Some(m),
        };

        let original_url = normalize_url(original_url)?;
        let created_at = Utc::now().timestamp_millis();

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let (short_code, manage_code) = self.codes.codes();
            let new_url = NewUrl {
                short_code,
                manage_code,
                original_url: original_url.clone(),
                session_id: session_id.to_string(),
                delete_after_minutes,
                created_at,
            };

            match self.storage.create(&new_url).await {
                Ok(url) => {
                    info!(short_code = %url.short_code, "created link");
                    return Ok(url);
                }
                Err(StorageError::Conflict) => {
                    warn!(attempt, "generated code collided with an existing link, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Storage(StorageError::Conflict))
    }

    /// Resolve a short code for a visitor.
    ///
    /// Expiry cleanup and visit capture are spawned in the background and
    /// never delay or alter the outcome.
    pub async fn redirect(
        &self,
        short_code: &str,
        visit: VisitContext,
    ) -> ServiceResult<RedirectOutcome> {
        let url = match self.storage.get_by_short_code(short_code).await {
            Ok(url) => url,
            Err(StorageError::NotFound) => return Ok(RedirectOutcome::NotFound),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now();

        if url.is_expired_at(now) {
            debug!(short_code = %url.short_code, "link expired, removing");
            self.spawn_expiry_cleanup(url);
            return Ok(RedirectOutcome::ExpiredToRoot);
        }

        if self.analytics_enabled {
            self.spawn_visit_capture(url.short_code.clone(), visit, now);
        }

        Ok(RedirectOutcome::Temporary(url.original_url))
    }

    /// Link details plus counts over its most recent visits
    pub async fn info(&self, manage_code: &str) -> ServiceResult<UrlStats> {
        let url = self.storage.get_by_manage_code(manage_code).await?;
        let visits = self
            .storage
            .get_recent_for(&url.short_code, analytics::VISIT_SAMPLE_LIMIT)
            .await?;
        let total_visits = self.storage.count_for(&url.short_code).await?;

        Ok(analytics::summarize(url, visits, total_visits))
    }

    /// Newest-first links of a session, at most `limit` (capped at [`MAX_LIST_LIMIT`])
    pub async fn list_mine(&self, session_id: &str, limit: i64) -> ServiceResult<Vec<UrlSummary>> {
        let limit = limit.min(MAX_LIST_LIMIT);
        if limit <= 0 || session_id.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self.storage.list_by_session(session_id, limit).await?)
    }

    /// Delete a link owned by `session_id` together with its visits
    pub async fn delete(&self, manage_code: &str, session_id: &str) -> ServiceResult<()> {
        let url = self.storage.delete(manage_code, session_id).await?;
        let removed = self.storage.delete_all_for(&url.short_code).await?;

        info!(short_code = %url.short_code, visits = removed, "deleted link");
        Ok(())
    }

    /// Remove every link whose lifetime has elapsed at `now`, returning how many were removed
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> ServiceResult<usize> {
        let candidates = self.storage.list_expirable().await?;
        let mut purged = 0;

        for url in candidates.into_iter().filter(|u| u.is_expired_at(now)) {
            match self.storage.delete(&url.manage_code, &url.session_id).await {
                Ok(_) => purged += 1,
                // Already removed by a concurrent redirect
                Err(StorageError::NotFound) => {}
                Err(e) => return Err(e.into()),
            }
            self.storage.delete_all_for(&url.short_code).await?;
        }

        if purged > 0 {
            info!(purged, "purged expired links");
        }
        Ok(purged)
    }

    fn spawn_expiry_cleanup(&self, url: ShortenedUrl) {
        let storage = Arc::clone(&self.storage);

        tokio::spawn(async move {
            // System-initiated: the link's own session stands in for the owner
            if let Err(e) = storage.delete(&url.manage_code, &url.session_id).await {
                warn!(short_code = %url.short_code, error = %e, "failed to delete expired link");
            }

            if let Err(e) = storage.delete_all_for(&url.short_code).await {
                warn!(short_code = %url.short_code, error = %e, "failed to delete visits of expired link");
            }
        });
    }

    fn spawn_visit_capture(&self, short_code: String, visit: VisitContext, at: DateTime<Utc>) {
        let storage = Arc::clone(&self.storage);
        let geo = Arc::clone(&self.geo);
        let user_agents = Arc::clone(&self.user_agents);

        tokio::spawn(async move {
            let geo = geo.lookup(visit.client_ip).await;
            let user_agent = user_agents.parse(&visit.user_agent);

            let record = VisitRecord {
                short_code,
                geo,
                referer: visit.referer,
                user_agent,
                occurred_at: at.timestamp_millis(),
            };

            match storage.record_visit(&record).await {
                Ok(()) => {}
                Err(StorageError::NotFound) => {
                    debug!(short_code = %record.short_code, "link removed before its visit was recorded");
                }
                Err(e) => {
                    warn!(short_code = %record.short_code, error = %e, "failed to record visit");
                }
            }
        });
    }
}

/// Validate a user-supplied URL, defaulting the scheme to `http`
fn normalize_url(raw: &str) -> ServiceResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::Validation("URL cannot be empty".to_string()));
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let parsed = Url::parse(&candidate)
        .map_err(|e| ServiceError::Validation(format!("invalid URL: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ServiceError::Validation(format!(
            "unsupported URL scheme: {}",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ServiceError::Validation("URL must include a host".to_string()));
    }

    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_http_scheme() {
        assert_eq!(normalize_url("example.com/path").unwrap(), "http://example.com/path");
        assert_eq!(
            normalize_url("  https://example.com/a?b=c  ").unwrap(),
            "https://example.com/a?b=c"
        );
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        assert!(matches!(normalize_url(""), Err(ServiceError::Validation(_))));
        assert!(matches!(normalize_url("http://"), Err(ServiceError::Validation(_))));
        assert!(matches!(normalize_url("ftp://example.com"), Err(ServiceError::Validation(_))));
        assert!(matches!(normalize_url("exa mple.com"), Err(ServiceError::Validation(_))));
    }
}
