use std::sync::Arc;

use crate::config::AnalyticsConfig;
use crate::service::LinkService;

/// State shared by every HTTP handler
pub struct AppState {
    pub service: Arc<LinkService>,
    /// Proxy trust and anonymization settings used when capturing visits
    pub analytics: AnalyticsConfig,
}
