//! Feed output structures.

use chrono::{DateTime, Utc};

/// A listing prepared for publication in a feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishableEntry {
    /// Display title, prefixed with the unavailable marker when needed
    pub title: String,
    /// Price or the "unspecified" placeholder
    pub price: String,
    pub link: String,
    /// HTML description fragment
    pub description: String,
    /// Stable identifier (the listing URL)
    pub guid: String,
    pub published: DateTime<Utc>,
    pub unavailable: bool,
}

/// Channel-level metadata for a published feed.
#[derive(Debug, Clone)]
pub struct FeedMetadata {
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: String,
    pub last_build: DateTime<Utc>,
}
