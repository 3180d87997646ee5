// src/models/mod.rs

//! Domain models for the feed generator.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod entry;
mod listing;

// Re-export all public types
pub use config::{CacheConfig, Config, FeedConfig, Labels, OutputConfig, ScraperConfig};
pub use entry::{FeedMetadata, PublishableEntry};
pub use listing::{
    CacheStore, Listing, MIN_TITLE_LEN, Observation, format_timestamp, parse_timestamp,
};
