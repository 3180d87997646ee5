// src/pipeline/run.rs

//! Per-feed pipeline and multi-feed runner.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, FeedConfig, FeedMetadata};
use crate::services::{FeedSink, Scraper};
use crate::storage::CacheStorage;

use super::availability::{AvailabilityStats, mark_availability};
use super::expire::expire_stale;
use super::merge::{MergeStats, merge_observations};
use super::project::project;

/// Outcome of one feed pipeline run.
#[derive(Debug, Clone, Default)]
pub struct FeedReport {
    pub feed_id: String,
    /// Listings in the cache before expiry
    pub loaded: usize,
    pub expired: usize,
    /// Observations returned by the scraper
    pub scraped: usize,
    /// `None` when the scrape came back empty and reconciliation was skipped
    pub merge: Option<MergeStats>,
    pub availability: Option<AvailabilityStats>,
    /// Listings persisted at the end of the run
    pub stored: usize,
    pub published: usize,
}

/// Outcome of a multi-feed run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub reports: Vec<FeedReport>,
    /// Ids of feeds whose pipeline failed
    pub failed: Vec<String>,
}

/// Run one feed's pipeline at the current time.
pub async fn run_feed(
    config: &Config,
    feed: FeedConfig,
    scraper: &dyn Scraper,
    storage: &dyn CacheStorage,
    sink: &dyn FeedSink,
) -> Result<FeedReport> {
    run_feed_at(config, feed, scraper, storage, sink, Utc::now()).await
}

/// Run one feed's pipeline as of `now`.
///
/// The cache is only written after reconciliation, so an error before that
/// point leaves the previous cache and feed untouched.
pub async fn run_feed_at(
    config: &Config,
    feed: FeedConfig,
    scraper: &dyn Scraper,
    storage: &dyn CacheStorage,
    sink: &dyn FeedSink,
    now: DateTime<Utc>,
) -> Result<FeedReport> {
    log::info!("==== {} ({}) ====", feed.title, feed.id);

    let mut report = FeedReport {
        feed_id: feed.id.clone(),
        ..FeedReport::default()
    };

    let mut store = storage.load_cache(&feed.cache_file).await;
    report.loaded = store.len();
    report.expired = expire_stale(&mut store, config.cache.max_age_days, now);

    let observations = scraper.scrape(&feed.url).await.unwrap_or_else(|e| {
        log::warn!("Scrape failed for {}: {}", feed.id, e);
        Vec::new()
    });
    report.scraped = observations.len();

    if observations.is_empty() {
        log::warn!(
            "No listings scraped for {}; keeping cached availability as is",
            feed.id
        );
    } else {
        let seen: HashSet<String> = observations.iter().map(|o| o.url.clone()).collect();
        report.merge = Some(merge_observations(&mut store, observations, now));

        let seen: HashSet<&str> = seen.iter().map(String::as_str).collect();
        report.availability = Some(mark_availability(&mut store, &seen));
    }

    storage.save_cache(&feed.cache_file, &store).await?;
    report.stored = store.len();

    let entries = project(&store, config.cache.max_items, &config.labels, now);
    let metadata = FeedMetadata {
        title: format!("{}{}", config.output.feed_title_prefix, feed.title),
        link: feed.url.clone(),
        description: feed.description.clone(),
        language: config.output.language.clone(),
        last_build: now,
    };
    sink.publish(&feed.feed_file, &metadata, &entries).await?;
    report.published = entries.len();

    log::info!(
        "{}: {} cached, {} expired, {} scraped, {} stored, {} published",
        report.feed_id,
        report.loaded,
        report.expired,
        report.scraped,
        report.stored,
        report.published
    );
    Ok(report)
}

/// Run every configured feed in order, pausing between feeds.
///
/// A failing feed is logged and does not stop the remaining ones.
pub async fn run_all(
    config: &Config,
    scraper: &dyn Scraper,
    storage: &dyn CacheStorage,
    sink: &dyn FeedSink,
) -> RunSummary {
    let delay = Duration::from_secs(config.scraper.feed_delay_secs);
    let mut summary = RunSummary::default();

    for (index, feed) in config.feeds.iter().cloned().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let feed_id = feed.id.clone();
        match run_feed(config, feed, scraper, storage, sink).await {
            Ok(report) => summary.reports.push(report),
            Err(e) => {
                log::error!("Feed {} failed: {}", feed_id, e);
                summary.failed.push(feed_id);
            }
        }
    }

    log::info!(
        "Processed {} feeds ({} failed)",
        config.feeds.len(),
        summary.failed.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use tempfile::TempDir;

    use crate::error::AppError;
    use crate::models::{CacheStore, Listing, Observation, PublishableEntry, format_timestamp};
    use crate::storage::LocalStorage;

    /// Scraper returning canned results per query URL.
    #[derive(Default)]
    struct CannedScraper {
        pages: HashMap<String, Vec<Observation>>,
        failing: HashSet<String>,
    }

    #[async_trait]
    impl Scraper for CannedScraper {
        async fn scrape(&self, query_url: &str) -> Result<Vec<Observation>> {
            if self.failing.contains(query_url) {
                return Err(AppError::scrape(query_url, "connection reset"));
            }
            Ok(self.pages.get(query_url).cloned().unwrap_or_default())
        }
    }

    /// Sink remembering what it was asked to publish.
    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<(String, FeedMetadata, Vec<PublishableEntry>)>>,
        reject: Option<String>,
    }

    #[async_trait]
    impl FeedSink for RecordingSink {
        async fn publish(
            &self,
            key: &str,
            metadata: &FeedMetadata,
            entries: &[PublishableEntry],
        ) -> Result<()> {
            if self.reject.as_deref() == Some(key) {
                return Err(AppError::Io(std::io::Error::other("disk full")));
            }
            self.published
                .lock()
                .unwrap()
                .push((key.to_string(), metadata.clone(), entries.to_vec()));
            Ok(())
        }
    }

    const QUERY: &str = "https://www.vinted.cz/catalog?search_text=lego";
    const A: &str = "https://www.vinted.cz/items/1";
    const B: &str = "https://www.vinted.cz/items/2";
    const C: &str = "https://www.vinted.cz/items/3";

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
    }

    fn feed(id: &str, url: &str) -> FeedConfig {
        FeedConfig {
            id: id.to_string(),
            url: url.to_string(),
            title: format!("LEGO {id}"),
            description: format!("Feed {id}"),
            cache_file: format!("cache/{id}.json"),
            feed_file: format!("docs/{id}.xml"),
        }
    }

    fn config_with(feeds: Vec<FeedConfig>) -> Config {
        let mut config = Config {
            feeds,
            ..Config::default()
        };
        config.scraper.feed_delay_secs = 0;
        config
    }

    fn cached(url: &str, title: &str, price: &str, first_seen: DateTime<Utc>) -> Listing {
        Listing {
            url: url.to_string(),
            title: Some(title.to_string()),
            price: Some(price.to_string()),
            first_seen: Some(format_timestamp(first_seen)),
            last_seen: Some(format_timestamp(first_seen)),
            ..Listing::default()
        }
    }

    async fn seed(storage: &LocalStorage, key: &str, listings: Vec<Listing>) {
        let store: CacheStore = listings.into_iter().map(|l| (l.url.clone(), l)).collect();
        storage.save_cache(key, &store).await.unwrap();
    }

    #[tokio::test]
    async fn test_full_reconcile_cycle() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config_with(vec![feed("lego", QUERY)]);
        let now = t0() + ChronoDuration::days(2);

        seed(
            &storage,
            "cache/lego.json",
            vec![
                cached(A, "Technic 42115", "100 Kč", t0()),
                cached(C, "Duplo farma 10869", "300 Kč", t0()),
            ],
        )
        .await;

        let mut scraper = CannedScraper::default();
        scraper.pages.insert(
            QUERY.into(),
            vec![
                Observation::new(A, "Technic 42115").with_price("150 Kč"),
                Observation::new(B, "Speed Champions 76917"),
            ],
        );
        let sink = RecordingSink::default();

        let report = run_feed_at(&config, feed("lego", QUERY), &scraper, &storage, &sink, now)
            .await
            .unwrap();

        assert_eq!(report.loaded, 2);
        assert_eq!(report.scraped, 2);
        assert_eq!(report.merge.unwrap().inserted, 1);
        assert_eq!(report.merge.unwrap().price_changed, 1);
        assert_eq!(report.availability.unwrap().newly_unavailable, 1);
        assert_eq!(report.stored, 3);
        assert_eq!(report.published, 3);

        let store = storage.load_cache("cache/lego.json").await;
        assert_eq!(store[A].price.as_deref(), Some("150 Kč"));
        assert_eq!(store[A].first_seen_at(), Some(t0()));
        assert!(!store[A].unavailable);
        assert_eq!(store[B].first_seen_at(), Some(now));
        assert!(!store[B].unavailable);
        assert!(store[C].unavailable);

        let published = sink.published.lock().unwrap();
        let (key, metadata, entries) = &published[0];
        assert_eq!(key, "docs/lego.xml");
        assert_eq!(metadata.title, "Vinted - LEGO lego");
        assert_eq!(metadata.link, QUERY);
        assert_eq!(entries[0].link, B);
        assert!(entries.iter().any(|e| e.link == C && e.title.starts_with("[PRODÁNO?]")));
    }

    #[tokio::test]
    async fn test_failed_scrape_skips_reconciliation() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config_with(vec![feed("lego", QUERY)]);
        let now = t0() + ChronoDuration::days(40);

        seed(
            &storage,
            "cache/lego.json",
            vec![
                cached(A, "Technic 42115", "100 Kč", t0()),
                cached(B, "Speed Champions 76917", "200 Kč", t0() + ChronoDuration::days(20)),
            ],
        )
        .await;

        let mut scraper = CannedScraper::default();
        scraper.failing.insert(QUERY.into());
        let sink = RecordingSink::default();

        let report = run_feed_at(&config, feed("lego", QUERY), &scraper, &storage, &sink, now)
            .await
            .unwrap();

        assert_eq!(report.expired, 1);
        assert!(report.merge.is_none());
        assert!(report.availability.is_none());

        let store = storage.load_cache("cache/lego.json").await;
        assert_eq!(store.len(), 1);
        assert!(!store[B].unavailable);
        assert_eq!(store[B].last_seen, store[B].first_seen);
        assert_eq!(sink.published.lock().unwrap()[0].2.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_scrape_on_empty_cache_still_publishes() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let config = config_with(vec![feed("new", QUERY)]);
        let sink = RecordingSink::default();

        let report = run_feed_at(
            &config,
            feed("new", QUERY),
            &CannedScraper::default(),
            &storage,
            &sink,
            t0(),
        )
        .await
        .unwrap();

        assert_eq!(report.stored, 0);
        assert!(storage.path("cache/new.json").exists());
        assert!(sink.published.lock().unwrap()[0].2.is_empty());
    }

    #[tokio::test]
    async fn test_run_all_continues_after_failure() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let first = feed("first", "https://www.vinted.cz/catalog?q=1");
        let second = feed("second", "https://www.vinted.cz/catalog?q=2");
        let config = config_with(vec![first.clone(), second.clone()]);

        let mut scraper = CannedScraper::default();
        scraper
            .pages
            .insert(first.url.clone(), vec![Observation::new(A, "Technic 42115")]);
        scraper
            .pages
            .insert(second.url.clone(), vec![Observation::new(B, "Duplo farma")]);

        let sink = RecordingSink {
            reject: Some(first.feed_file.clone()),
            ..RecordingSink::default()
        };

        let summary = run_all(&config, &scraper, &storage, &sink).await;

        assert_eq!(summary.failed, vec!["first".to_string()]);
        assert_eq!(summary.reports.len(), 1);
        assert_eq!(summary.reports[0].feed_id, "second");
        assert!(storage.path("cache/second.json").exists());

        let published = sink.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, second.feed_file);
    }
}
