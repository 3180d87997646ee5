//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Resolve a listing link and drop its query string and fragment, so the
/// same listing reached from different pages maps to one key.
pub fn canonical_listing_url(base: &Url, href: &str) -> String {
    match base.join(href) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => href.to_string(),
    }
}
