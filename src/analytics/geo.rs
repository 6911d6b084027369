//! Geo lookup providers
//!
//! Lookups are best-effort: a provider never fails its caller, it returns
//! whatever fields it could resolve and leaves the rest empty.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::analytics::geoip::MaxMindGeoLookup;
use crate::config::{AnalyticsConfig, GeoProvider};
use crate::models::GeoInfo;

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: IpAddr) -> GeoInfo;
}

/// Provider that resolves nothing and only echoes the address
pub struct NoopGeoLookup;

#[async_trait]
impl GeoLookup for NoopGeoLookup {
    async fn lookup(&self, ip: IpAddr) -> GeoInfo {
        GeoInfo {
            ip: ip.to_string(),
            ..Default::default()
        }
    }
}

/// JSON body returned by ip-api style lookup services
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoResponse {
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
    /// Full region name; some services only put a short code in `region`
    #[serde(default)]
    region_name: Option<String>,
    /// The address the service resolved, echoed back
    #[serde(default)]
    query: Option<String>,
}

impl GeoResponse {
    fn into_geo_info(self, ip: IpAddr) -> GeoInfo {
        GeoInfo {
            country: self.country.unwrap_or_default(),
            country_code: self.country_code.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            region: self
                .region_name
                .filter(|r| !r.is_empty())
                .or(self.region)
                .unwrap_or_default(),
            ip: self
                .query
                .filter(|q| !q.is_empty())
                .unwrap_or_else(|| ip.to_string()),
        }
    }
}

/// Provider backed by an external HTTP JSON service
pub struct HttpGeoLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGeoLookup {
    /// `endpoint` is a URL template; `{ip}` is replaced with the address being looked up
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build geo lookup HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn url_for(&self, ip: IpAddr) -> String {
        self.endpoint.replace("{ip}", &ip.to_string())
    }

    async fn fetch(&self, ip: IpAddr) -> Result<GeoResponse> {
        let response = self
            .client
            .get(self.url_for(ip))
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<GeoResponse>().await?)
    }
}

#[async_trait]
impl GeoLookup for HttpGeoLookup {
    async fn lookup(&self, ip: IpAddr) -> GeoInfo {
        match self.fetch(ip).await {
            Ok(body) => body.into_geo_info(ip),
            Err(e) => {
                debug!(%ip, error = %e, "geo lookup failed");
                GeoInfo {
                    ip: ip.to_string(),
                    ..Default::default()
                }
            }
        }
    }
}

/// Build the provider selected by configuration
pub fn build_geo_lookup(config: &AnalyticsConfig) -> Result<Arc<dyn GeoLookup>> {
    let provider: Arc<dyn GeoLookup> = match config.geo_provider {
        GeoProvider::None => Arc::new(NoopGeoLookup),
        GeoProvider::Http => Arc::new(HttpGeoLookup::new(
            config.geo_http_endpoint.clone(),
            Duration::from_secs(config.geo_timeout_secs),
        )?),
        GeoProvider::Maxmind => {
            let path = config
                .geoip_db_path
                .as_deref()
                .context("GEOIP_DB_PATH must be set when GEO_PROVIDER=maxmind")?;
            Arc::new(MaxMindGeoLookup::new(path)?)
        }
    };

    Ok(provider)
}
