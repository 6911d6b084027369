//! Read-side reduction of raw visit records into per-dimension counts

use crate::analytics::models::{FrequencyTable, UrlStats, VisitTables};
use crate::models::{ShortenedUrl, VisitRecord};

/// Maximum number of visits loaded into a single summary
pub const VISIT_SAMPLE_LIMIT: i64 = 25;

fn bump(table: &mut FrequencyTable, key: &str) {
    if key.is_empty() {
        return;
    }
    *table.entry(key.to_string()).or_insert(0) += 1;
}

/// Count visits per country code, referer and browser.
///
/// Each table skips empty values on its own, so a visit without geo data
/// still counts towards referers and browsers.
pub fn tally<'a, I>(visits: I) -> VisitTables
where
    I: IntoIterator<Item = &'a VisitRecord>,
{
    let mut tables = VisitTables::default();

    for visit in visits {
        bump(&mut tables.countries, &visit.geo.country_code);
        bump(&mut tables.referers, &visit.referer);
        bump(&mut tables.browsers, &visit.user_agent.browser);
    }

    tables
}

/// Build the owner-facing summary of a link from a sample of its visits
pub fn summarize(url: ShortenedUrl, visits: Vec<VisitRecord>, total_visits: i64) -> UrlStats {
    let tables = tally(&visits);

    UrlStats {
        url,
        total_visits,
        visits,
        tables,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoInfo, UserAgentInfo};
    use std::collections::HashMap;

    fn visit(country_code: &str, referer: &str, browser: &str) -> VisitRecord {
        VisitRecord {
            short_code: "abc123".to_string(),
            geo: GeoInfo {
                country_code: country_code.to_string(),
                ..Default::default()
            },
            referer: referer.to_string(),
            user_agent: UserAgentInfo {
                browser: browser.to_string(),
                os: String::new(),
            },
            occurred_at: 0,
        }
    }

    fn table(entries: &[(&str, u64)]) -> FrequencyTable {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn test_tally_counts_each_dimension() {
        let visits = vec![
            visit("us", "a", "chrome"),
            visit("us", "", "chrome"),
            visit("fr", "b", "firefox"),
        ];

        let tables = tally(&visits);

        assert_eq!(tables.countries, table(&[("us", 2), ("fr", 1)]));
        assert_eq!(tables.referers, table(&[("a", 1), ("b", 1)]));
        assert_eq!(tables.browsers, table(&[("chrome", 2), ("firefox", 1)]));
    }

    #[test]
    fn test_missing_fields_are_skipped_per_table() {
        let visits = vec![visit("", "news.example", "safari"), visit("de", "", "")];

        let tables = tally(&visits);

        assert_eq!(tables.countries, table(&[("de", 1)]));
        assert_eq!(tables.referers, table(&[("news.example", 1)]));
        assert_eq!(tables.browsers, table(&[("safari", 1)]));
    }

    #[test]
    fn test_tally_empty() {
        assert_eq!(tally(&Vec::<VisitRecord>::new()), VisitTables::default());
    }

    #[test]
    fn test_summarize_keeps_sample_and_total() {
        let url = ShortenedUrl {
            id: 1,
            short_code: "abc123".to_string(),
            manage_code: "mng456".to_string(),
            original_url: "http://example.com".to_string(),
            session_id: "owner".to_string(),
            delete_after_minutes: None,
            created_at: 0,
        };

        let stats = summarize(url, vec![visit("us", "", "chrome")], 40);

        assert_eq!(stats.total_visits, 40);
        assert_eq!(stats.visits.len(), 1);
        assert_eq!(stats.tables.countries, table(&[("us", 1)]));
    }
}
