//! Geo lookup using a local MaxMind GeoLite2/GeoIP2 City MMDB
//!
//! The database is memory-mapped once and shared by every lookup.

use anyhow::{Context, Result};
use async_trait::async_trait;
use maxminddb::{geoip2, Mmap, Reader};
use std::net::IpAddr;
use std::sync::Arc;

use crate::analytics::geo::GeoLookup;
use crate::models::GeoInfo;

#[derive(Clone)]
pub struct MaxMindGeoLookup {
    reader: Arc<Reader<Mmap>>,
}

impl MaxMindGeoLookup {
    /// Open the City (or Country) database at `path`
    pub fn new(path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(path) }
            .with_context(|| format!("Failed to open GeoIP database at {}", path))?;

        Ok(Self {
            reader: Arc::new(reader),
        })
    }

    fn resolve(&self, ip: IpAddr) -> GeoInfo {
        let mut geo = GeoInfo {
            ip: ip.to_string(),
            ..Default::default()
        };

        let Ok(result) = self.reader.lookup(ip) else {
            return geo;
        };

        if let Ok(Some(city)) = result.decode::<geoip2::City>() {
            geo.country_code = city.country.iso_code.map(|s| s.to_string()).unwrap_or_default();
            geo.country = city
                .country
                .names
                .english
                .map(|s| s.to_string())
                .unwrap_or_default();

            if let Some(subdivision) = city.subdivisions.first() {
                geo.region = subdivision
                    .names
                    .english
                    .map(|s| s.to_string())
                    .unwrap_or_default();
            }

            geo.city = city.city.names.english.map(|s| s.to_string()).unwrap_or_default();
            return geo;
        }

        // Country-only databases decode as a subset of City
        if let Ok(Some(country)) = result.decode::<geoip2::Country>() {
            geo.country_code = country
                .country
                .iso_code
                .map(|s| s.to_string())
                .unwrap_or_default();
            geo.country = country
                .country
                .names
                .english
                .map(|s| s.to_string())
                .unwrap_or_default();
        }

        geo
    }
}

#[async_trait]
impl GeoLookup for MaxMindGeoLookup {
    async fn lookup(&self, ip: IpAddr) -> GeoInfo {
        self.resolve(ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_invalid_path() {
        let result = MaxMindGeoLookup::new("/nonexistent/path.mmdb");
        assert!(result.is_err());
    }
}
