use anyhow::Context;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub session: SessionConfig,
    pub analytics: AnalyticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: String,
    pub max_connections: u32,
    /// Upper bound applied to every individual storage call
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Secret used to sign session cookies.
    /// If None, a random per-process key is used and sessions do not survive restarts.
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoProvider {
    None,
    Http,
    Maxmind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustedProxyMode {
    None,
    Standard,
    Cloudflare,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub enabled: bool,
    pub geo_provider: GeoProvider,
    /// Endpoint template for the HTTP geo provider, `{ip}` is substituted
    pub geo_http_endpoint: String,
    pub geo_timeout_secs: u64,
    pub geoip_db_path: Option<String>,
    pub ip_anonymization: bool,
    pub trusted_proxy_mode: TrustedProxyMode,
    pub trusted_proxies: Vec<IpNet>,
    pub num_trusted_proxies: Option<usize>,
}

impl AnalyticsConfig {
    pub const DEFAULT_GEO_HTTP_ENDPOINT: &'static str = "http://ip-api.com/json/{ip}";
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            geo_provider: GeoProvider::None,
            geo_http_endpoint: Self::DEFAULT_GEO_HTTP_ENDPOINT.to_string(),
            geo_timeout_secs: 2,
            geoip_db_path: None,
            ip_anonymization: false,
            trusted_proxy_mode: TrustedProxyMode::None,
            trusted_proxies: Vec::new(),
            num_trusted_proxies: None,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

fn env_parse<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{name} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn parse_trusted_proxies(raw: &str) -> anyhow::Result<Vec<IpNet>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpNet>()
                .with_context(|| format!("TRUSTED_PROXIES contains an invalid CIDR: {s}"))
        })
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let backend_str =
            std::env::var("DATABASE_BACKEND").unwrap_or_else(|_| "sqlite".to_string());

        let backend = match backend_str.to_lowercase().as_str() {
            "postgres" | "postgresql" => DatabaseBackend::Postgres,
            _ => DatabaseBackend::Sqlite,
        };

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./tinylink.db?mode=rwc".to_string());
        let max_connections = env_parse("DATABASE_MAX_CONNECTIONS", 5u32)?;
        let timeout_secs = env_parse("STORAGE_TIMEOUT_SECS", 5u64)?;

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_parse("PORT", 8000u16)?;

        let cookie_name =
            std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "tinylink_session".to_string());
        let secret = std::env::var("SESSION_SECRET").ok().filter(|s| !s.is_empty());

        let geo_provider = match std::env::var("GEO_PROVIDER")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => GeoProvider::None,
            "http" => GeoProvider::Http,
            "maxmind" => GeoProvider::Maxmind,
            other => {
                tracing::warn!(
                    "Unknown GEO_PROVIDER '{other}', falling back to 'none'. Supported values: none, http, maxmind"
                );
                GeoProvider::None
            }
        };

        let geoip_db_path = std::env::var("GEOIP_DB_PATH").ok();
        if matches!(geo_provider, GeoProvider::Maxmind) && geoip_db_path.is_none() {
            anyhow::bail!("GEOIP_DB_PATH must be set when GEO_PROVIDER=maxmind");
        }

        let trusted_proxy_mode = match std::env::var("TRUSTED_PROXY_MODE")
            .unwrap_or_else(|_| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "none" => TrustedProxyMode::None,
            "standard" => TrustedProxyMode::Standard,
            "cloudflare" => TrustedProxyMode::Cloudflare,
            other => {
                tracing::warn!(
                    "Unknown TRUSTED_PROXY_MODE '{other}', falling back to 'none'. Supported values: none, standard, cloudflare"
                );
                TrustedProxyMode::None
            }
        };

        let trusted_proxies = match std::env::var("TRUSTED_PROXIES") {
            Ok(raw) => parse_trusted_proxies(&raw)?,
            Err(_) => Vec::new(),
        };

        let num_trusted_proxies = std::env::var("NUM_TRUSTED_PROXIES")
            .ok()
            .map(|v| {
                v.trim()
                    .parse::<usize>()
                    .with_context(|| format!("NUM_TRUSTED_PROXIES has an invalid value: {v}"))
            })
            .transpose()?;

        let analytics = AnalyticsConfig {
            enabled: env_flag("ANALYTICS_ENABLED", true),
            geo_provider,
            geo_http_endpoint: std::env::var("GEO_HTTP_ENDPOINT")
                .unwrap_or_else(|_| AnalyticsConfig::DEFAULT_GEO_HTTP_ENDPOINT.to_string()),
            geo_timeout_secs: env_parse("GEO_TIMEOUT_SECS", 2u64)?,
            geoip_db_path,
            ip_anonymization: env_flag("IP_ANONYMIZATION", false),
            trusted_proxy_mode,
            trusted_proxies,
            num_trusted_proxies,
        };

        Ok(Config {
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
                timeout_secs,
            },
            server: ServerConfig { host, port },
            session: SessionConfig {
                cookie_name,
                secret,
            },
            analytics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trusted_proxies() {
        let nets = parse_trusted_proxies("10.0.0.0/8, 192.168.0.0/16,,").unwrap();
        assert_eq!(nets.len(), 2);
        assert_eq!(nets[0], "10.0.0.0/8".parse::<IpNet>().unwrap());
    }

    #[test]
    fn test_parse_trusted_proxies_rejects_garbage() {
        assert!(parse_trusted_proxies("10.0.0.0/8,not-a-cidr").is_err());
    }
}
