//! Visit analytics
//!
//! Capture side: client IP extraction, geo lookup and user-agent parsing,
//! run in the background of a redirect. Read side: reduction of stored
//! visit records into per-dimension counts.

pub mod aggregator;
pub mod geo;
pub mod geoip;
pub mod ip_extractor;
pub mod models;
pub mod user_agent;

pub use aggregator::{summarize, tally, VISIT_SAMPLE_LIMIT};
pub use geo::{build_geo_lookup, GeoLookup, HttpGeoLookup, NoopGeoLookup};
pub use geoip::MaxMindGeoLookup;
pub use ip_extractor::{anonymize_ip, extract_client_ip};
pub use models::{FrequencyTable, UrlStats, VisitTables};
pub use user_agent::UserAgentParser;
