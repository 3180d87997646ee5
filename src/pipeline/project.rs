// src/pipeline/project.rs

//! Selecting and ordering cached listings for publication.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::models::{CacheStore, Labels, Listing, PublishableEntry};

/// Newest first by `first_seen`; listings with no parsable timestamp go
/// last. Ties fall back to URL so the output is stable between runs.
fn newest_first(
    a: &(Option<DateTime<Utc>>, &Listing),
    b: &(Option<DateTime<Utc>>, &Listing),
) -> Ordering {
    match (a.0, b.0) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.1.url.cmp(&b.1.url))
}

/// Project the store into at most `max_items` feed entries.
pub fn project(
    store: &CacheStore,
    max_items: usize,
    labels: &Labels,
    now: DateTime<Utc>,
) -> Vec<PublishableEntry> {
    let mut eligible: Vec<(Option<DateTime<Utc>>, &Listing)> = store
        .values()
        .filter(|listing| listing.publishable_title().is_some())
        .map(|listing| (listing.first_seen_at(), listing))
        .collect();

    eligible.sort_by(newest_first);
    eligible.truncate(max_items);

    eligible
        .into_iter()
        .filter_map(|(first_seen, listing)| {
            let title = listing.publishable_title()?;
            Some(build_entry(listing, title, first_seen.unwrap_or(now), labels))
        })
        .collect()
}

fn build_entry(
    listing: &Listing,
    title: &str,
    published: DateTime<Utc>,
    labels: &Labels,
) -> PublishableEntry {
    let price = listing
        .price
        .clone()
        .unwrap_or_else(|| labels.price_unspecified.clone());

    let display_title = if listing.unavailable {
        format!("{} {} - {}", labels.unavailable_marker, title, price)
    } else {
        format!("{} - {}", title, price)
    };

    PublishableEntry {
        title: display_title,
        description: describe(listing, &price, labels),
        price,
        link: listing.url.clone(),
        guid: listing.url.clone(),
        published,
        unavailable: listing.unavailable,
    }
}

/// Compose the HTML description of an entry.
fn describe(listing: &Listing, price: &str, labels: &Labels) -> String {
    let mut description = String::new();

    if listing.unavailable {
        description.push_str(&format!(
            r#"<p style="color: red;">{}</p>"#,
            labels.unavailable_warning
        ));
    }
    if let Some(image) = &listing.image {
        description.push_str(&format!(
            r#"<img src="{}" style="max-width: 400px;"><br>"#,
            image
        ));
    }

    description.push_str(&format!("<b>{}:</b> {}<br>", labels.price, price));

    if let Some(brand) = &listing.brand {
        description.push_str(&format!("<b>{}:</b> {}<br>", labels.brand, brand));
    }
    if let Some(condition) = &listing.condition {
        description.push_str(&format!("<b>{}:</b> {}<br>", labels.condition, condition));
    }

    description
}
