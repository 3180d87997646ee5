//! Service layer for the feed generator.
//!
//! This module contains the collaborators around the reconcile core:
//! - Catalog scraping (`Scraper`, `CatalogScraper`)
//! - Feed publishing (`FeedSink`, `RssFileSink`)

mod catalog;
mod feed;

pub use catalog::{CatalogScraper, Scraper, parse_listing_label};
pub use feed::{FeedSink, RssFileSink, build_channel};
