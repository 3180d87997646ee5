// src/services/feed.rs

//! Feed publishing service.

use async_trait::async_trait;
use rss::{Channel, ChannelBuilder, GuidBuilder, Item, ItemBuilder};

use crate::error::{AppError, Result};
use crate::models::{FeedMetadata, PublishableEntry};
use crate::storage::LocalStorage;

/// Destination for projected feed entries.
#[async_trait]
pub trait FeedSink: Send + Sync {
    /// Publish `entries` in order under `key`.
    async fn publish(
        &self,
        key: &str,
        metadata: &FeedMetadata,
        entries: &[PublishableEntry],
    ) -> Result<()>;
}

/// Writes RSS 2.0 documents to the local filesystem.
#[derive(Debug, Clone)]
pub struct RssFileSink {
    storage: LocalStorage,
}

impl RssFileSink {
    /// Create a sink writing below `storage`'s root.
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }
}

fn build_item(entry: &PublishableEntry) -> Item {
    let guid = GuidBuilder::default()
        .value(entry.guid.clone())
        .permalink(true)
        .build();

    ItemBuilder::default()
        .title(entry.title.clone())
        .link(entry.link.clone())
        .description(entry.description.clone())
        .guid(guid)
        .pub_date(entry.published.to_rfc2822())
        .build()
}

/// Build an RSS channel from feed metadata and ordered entries.
pub fn build_channel(metadata: &FeedMetadata, entries: &[PublishableEntry]) -> Channel {
    ChannelBuilder::default()
        .title(metadata.title.clone())
        .link(metadata.link.clone())
        .description(metadata.description.clone())
        .language(metadata.language.clone())
        .last_build_date(metadata.last_build.to_rfc2822())
        .items(entries.iter().map(build_item).collect::<Vec<_>>())
        .build()
}

#[async_trait]
impl FeedSink for RssFileSink {
    async fn publish(
        &self,
        key: &str,
        metadata: &FeedMetadata,
        entries: &[PublishableEntry],
    ) -> Result<()> {
        let channel = build_channel(metadata, entries);
        self.storage
            .write_bytes(key, channel.to_string().as_bytes())
            .await
            .map_err(|e| AppError::feed(key, e))?;

        log::info!("Feed: {} ({} entries)", key, entries.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn metadata() -> FeedMetadata {
        FeedMetadata {
            title: "Vinted - LEGO Duplo".into(),
            link: "https://www.vinted.cz/catalog?search_text=duplo".into(),
            description: "LEGO Duplo".into(),
            language: "cs".into(),
            last_build: Utc.with_ymd_and_hms(2025, 10, 2, 6, 0, 0).unwrap(),
        }
    }

    fn entry(n: u32) -> PublishableEntry {
        let url = format!("https://www.vinted.cz/items/{n}");
        PublishableEntry {
            title: format!("Duplo set {n} - 100 Kč"),
            price: "100 Kč".into(),
            link: url.clone(),
            description: "<b>Cena:</b> 100 Kč<br>".into(),
            guid: url,
            published: Utc.with_ymd_and_hms(2025, 10, 1, n, 0, 0).unwrap(),
            unavailable: false,
        }
    }

    #[test]
    fn test_channel_keeps_entry_order() {
        let channel = build_channel(&metadata(), &[entry(3), entry(1), entry(2)]);

        let links: Vec<&str> = channel.items().iter().filter_map(|i| i.link()).collect();
        assert_eq!(
            links,
            vec![
                "https://www.vinted.cz/items/3",
                "https://www.vinted.cz/items/1",
                "https://www.vinted.cz/items/2"
            ]
        );
        assert_eq!(channel.language(), Some("cs"));
        assert_eq!(
            channel.items()[0].guid().map(|g| g.value()),
            Some("https://www.vinted.cz/items/3")
        );
        assert!(channel.items()[0].guid().unwrap().is_permalink());
    }

    #[tokio::test]
    async fn test_publish_writes_readable_feed() {
        let tmp = TempDir::new().unwrap();
        let sink = RssFileSink::new(LocalStorage::new(tmp.path()));

        sink.publish("docs/duplo.xml", &metadata(), &[entry(1)])
            .await
            .unwrap();

        let bytes = std::fs::read(tmp.path().join("docs/duplo.xml")).unwrap();
        let channel = Channel::read_from(&bytes[..]).unwrap();
        assert_eq!(channel.title(), "Vinted - LEGO Duplo");
        assert_eq!(channel.items().len(), 1);
        assert_eq!(channel.items()[0].title(), Some("Duplo set 1 - 100 Kč"));
        assert_eq!(
            channel.items()[0].description(),
            Some("<b>Cena:</b> 100 Kč<br>")
        );
    }

    #[tokio::test]
    async fn test_publish_failure_is_feed_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("docs"), b"not a directory").unwrap();
        let sink = RssFileSink::new(LocalStorage::new(tmp.path()));

        let err = sink
            .publish("docs/duplo.xml", &metadata(), &[entry(1)])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Feed(ref msg) if msg.starts_with("docs/duplo.xml")));
    }
}
