// src/pipeline/merge.rs

//! Merging freshly scraped observations into the cache store.
//!
//! A listing keeps the attributes of its first observation. Only the price
//! follows later observations, and only when a price was actually seen, so
//! a sparse re-scrape never wipes out data gathered earlier.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{CacheStore, Listing, Observation, format_timestamp};

/// Counters reported by a merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Listings seen for the first time
    pub inserted: usize,
    /// Known listings seen again
    pub refreshed: usize,
    /// Known listings whose price changed
    pub price_changed: usize,
}

/// Collapse observations to one per URL, keeping the last occurrence.
fn dedup_last_wins(observations: Vec<Observation>) -> Vec<Observation> {
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Observation> = Vec::with_capacity(observations.len());

    for observation in observations {
        match position.get(&observation.url) {
            Some(&index) => unique[index] = observation,
            None => {
                position.insert(observation.url.clone(), unique.len());
                unique.push(observation);
            }
        }
    }
    unique
}

/// Merge observations into `store` at time `now`.
pub fn merge_observations(
    store: &mut CacheStore,
    observations: Vec<Observation>,
    now: DateTime<Utc>,
) -> MergeStats {
    let stamp = format_timestamp(now);
    let mut stats = MergeStats::default();

    for observation in dedup_last_wins(observations) {
        match store.get_mut(&observation.url) {
            Some(listing) => {
                listing.last_seen = Some(stamp.clone());
                listing.unavailable = false;
                stats.refreshed += 1;

                if let Some(price) = observation.price {
                    if listing.price.as_deref() != Some(price.as_str()) {
                        log::debug!(
                            "Price change for {}: {:?} -> {}",
                            listing.url,
                            listing.price,
                            price
                        );
                        listing.price = Some(price);
                        stats.price_changed += 1;
                    }
                }
            }
            None => {
                store.insert(
                    observation.url.clone(),
                    Listing::first_observed(observation, now),
                );
                stats.inserted += 1;
            }
        }
    }

    if stats.inserted > 0 {
        log::info!("Added {} new listings", stats.inserted);
    }
    if stats.price_changed > 0 {
        log::info!("Updated price on {} listings", stats.price_changed);
    }
    stats
}
