// src/pipeline/expire.rs

//! Age-based removal of cached listings.

use chrono::{DateTime, Utc};

use crate::models::CacheStore;

/// Remove every listing first seen more than `max_age_days` whole days
/// before `now`. Returns the number of listings removed.
///
/// Listings without a parsable `first_seen` are never removed.
pub fn expire_stale(store: &mut CacheStore, max_age_days: i64, now: DateTime<Utc>) -> usize {
    let before = store.len();

    store.retain(|_, listing| match listing.first_seen_at() {
        Some(first_seen) => (now - first_seen).num_days() <= max_age_days,
        None => true,
    });

    let removed = before - store.len();
    if removed > 0 {
        log::info!(
            "Expired {} listings older than {} days",
            removed,
            max_age_days
        );
    }
    removed
}
