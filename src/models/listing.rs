//! Listing data structures and timestamp handling.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Minimum title length (in grapheme clusters) for a listing to be published.
pub const MIN_TITLE_LEN: usize = 5;

/// Durable mapping from listing URL to tracked listing state.
pub type CacheStore = BTreeMap<String, Listing>;

/// A raw listing as observed by a single scrape pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Observation {
    /// Canonical listing URL
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Free-text price (e.g. "150 Kč")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    /// Absolute image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Observation {
    /// Create an observation with only a URL and title.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Set the observed price.
    pub fn with_price(mut self, price: impl Into<String>) -> Self {
        self.price = Some(price.into());
        self
    }
}

/// A listing tracked across runs.
///
/// Timestamps are kept as the raw persisted strings so that a cache file
/// with a malformed value still loads; use [`Listing::first_seen_at`] to
/// interpret them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    /// Unique identifier and link. Normalized to the store key on load.
    #[serde(default)]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Set once at first observation (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_seen: Option<String>,

    /// Refreshed on every reappearance (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,

    /// True when absent from the most recent scrape
    #[serde(default)]
    pub unavailable: bool,
}

impl Listing {
    /// Start tracking a listing observed for the first time at `now`.
    pub fn first_observed(observation: Observation, now: DateTime<Utc>) -> Self {
        let stamp = format_timestamp(now);
        Self {
            url: observation.url,
            title: observation.title,
            price: observation.price,
            brand: observation.brand,
            condition: observation.condition,
            size: observation.size,
            image: observation.image,
            first_seen: Some(stamp.clone()),
            last_seen: Some(stamp),
            unavailable: false,
        }
    }

    /// Parsed `first_seen`, or `None` when missing or malformed.
    pub fn first_seen_at(&self) -> Option<DateTime<Utc>> {
        self.first_seen.as_deref().and_then(parse_timestamp)
    }

    /// Trimmed title if it is long enough to publish.
    pub fn publishable_title(&self) -> Option<&str> {
        let title = self.title.as_deref()?.trim();
        (title.chars().count() >= MIN_TITLE_LEN).then_some(title)
    }
}

/// Format a timestamp the way it is persisted in the cache.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Parse a persisted timestamp.
///
/// Accepts RFC 3339 with an offset, or a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// value which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let at = parse_timestamp("2025-03-01T12:00:00+01:00").unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2025, 3, 1, 11, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_as_utc() {
        let at = parse_timestamp("2025-03-01T12:00:00.250").unwrap();
        assert_eq!(at.timestamp(), Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap().timestamp());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_format_roundtrips_through_parse() {
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 8, 30, 15).unwrap();
        assert_eq!(parse_timestamp(&format_timestamp(now)), Some(now));
    }

    #[test]
    fn test_first_observed_sets_both_timestamps() {
        let now = Utc.with_ymd_and_hms(2025, 10, 1, 8, 0, 0).unwrap();
        let listing = Listing::first_observed(
            Observation::new("https://example.com/items/1", "Lego 42115").with_price("100 Kč"),
            now,
        );
        assert_eq!(listing.first_seen, listing.last_seen);
        assert_eq!(listing.first_seen_at(), Some(now));
        assert!(!listing.unavailable);
        assert_eq!(listing.price.as_deref(), Some("100 Kč"));
    }

    #[test]
    fn test_publishable_title() {
        let mut listing = Listing {
            title: Some("  Duplo  ".into()),
            ..Listing::default()
        };
        assert_eq!(listing.publishable_title(), Some("Duplo"));

        listing.title = Some(" Lego ".into());
        assert_eq!(listing.publishable_title(), None);

        listing.title = None;
        assert_eq!(listing.publishable_title(), None);
    }

    #[test]
    fn test_publishable_title_counts_code_points() {
        // four glyphs, five code points
        let listing = Listing {
            title: Some("Lege\u{301}".into()),
            ..Listing::default()
        };
        assert_eq!(listing.publishable_title(), Some("Lege\u{301}"));
    }

    #[test]
    fn test_deserialize_sparse_record() {
        let listing: Listing = serde_json::from_str(r#"{"title": "Technic 8880"}"#).unwrap();
        assert!(listing.url.is_empty());
        assert!(!listing.unavailable);
        assert!(listing.first_seen.is_none());
    }
}
