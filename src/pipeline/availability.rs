// src/pipeline/availability.rs

//! Flagging listings that disappeared from the latest scrape.

use std::collections::HashSet;

use crate::models::CacheStore;

/// Counters reported by an availability pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AvailabilityStats {
    /// Listings that just went missing
    pub newly_unavailable: usize,
    /// Listings that came back
    pub restored: usize,
}

/// Set `unavailable` on every listing according to whether its URL is in
/// `seen`, the URL set of the current scrape pass.
pub fn mark_availability(store: &mut CacheStore, seen: &HashSet<&str>) -> AvailabilityStats {
    let mut stats = AvailabilityStats::default();

    for (url, listing) in store.iter_mut() {
        let unavailable = !seen.contains(url.as_str());
        if unavailable != listing.unavailable {
            if unavailable {
                stats.newly_unavailable += 1;
            } else {
                stats.restored += 1;
            }
            listing.unavailable = unavailable;
        }
    }

    if stats.newly_unavailable > 0 {
        log::info!("{} listings no longer available", stats.newly_unavailable);
    }
    stats
}
