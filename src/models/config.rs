//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Cache retention and feed size
    #[serde(default)]
    pub cache: CacheConfig,

    /// Feed channel settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Text used when composing feed entries
    #[serde(default)]
    pub labels: Labels,

    /// Tracked search queries
    #[serde(default = "defaults::default_feeds")]
    pub feeds: Vec<FeedConfig>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scraper.user_agent.trim().is_empty() {
            return Err(AppError::validation("scraper.user_agent is empty"));
        }
        if self.scraper.timeout_secs == 0 {
            return Err(AppError::validation("scraper.timeout_secs must be > 0"));
        }
        if self.cache.max_age_days < 0 {
            return Err(AppError::validation("cache.max_age_days must be >= 0"));
        }
        if self.cache.max_items == 0 {
            return Err(AppError::validation("cache.max_items must be > 0"));
        }
        if self.feeds.is_empty() {
            return Err(AppError::validation("No feeds defined"));
        }

        let mut ids = HashSet::new();
        for feed in &self.feeds {
            if feed.id.trim().is_empty() {
                return Err(AppError::validation("Feed with empty id"));
            }
            if !ids.insert(feed.id.as_str()) {
                return Err(AppError::validation(format!("Duplicate feed id '{}'", feed.id)));
            }
            if feed.url.trim().is_empty() {
                return Err(AppError::validation(format!("Feed '{}' has no url", feed.id)));
            }
            if feed.cache_file.trim().is_empty() || feed.feed_file.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Feed '{}' needs both cache_file and feed_file",
                    feed.id
                )));
            }
        }
        Ok(())
    }

    /// Look up a feed by id.
    pub fn feed(&self, id: &str) -> Result<&FeedConfig> {
        self.feeds
            .iter()
            .find(|feed| feed.id == id)
            .ok_or_else(|| AppError::config(format!("Feed '{id}' does not exist")))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            cache: CacheConfig::default(),
            output: OutputConfig::default(),
            labels: Labels::default(),
            feeds: defaults::default_feeds(),
        }
    }
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Origin used to resolve relative listing links
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause between consecutive feeds in a multi-feed run
    #[serde(default = "defaults::feed_delay")]
    pub feed_delay_secs: u64,

    /// Drop listings rendered inside promoted closet blocks
    #[serde(default = "defaults::enabled")]
    pub skip_promoted: bool,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            feed_delay_secs: defaults::feed_delay(),
            skip_promoted: defaults::enabled(),
        }
    }
}

/// Cache retention and projection limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Listings first seen longer ago than this are dropped
    #[serde(default = "defaults::max_age_days")]
    pub max_age_days: i64,

    /// Maximum number of entries published per feed
    #[serde(default = "defaults::max_items")]
    pub max_items: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_days: defaults::max_age_days(),
            max_items: defaults::max_items(),
        }
    }
}

/// Feed channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "defaults::language")]
    pub language: String,

    /// Prepended to every feed title
    #[serde(default = "defaults::feed_title_prefix")]
    pub feed_title_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            language: defaults::language(),
            feed_title_prefix: defaults::feed_title_prefix(),
        }
    }
}

/// Display strings for feed entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Labels {
    #[serde(default = "defaults::unavailable_marker")]
    pub unavailable_marker: String,
    #[serde(default = "defaults::unavailable_warning")]
    pub unavailable_warning: String,
    #[serde(default = "defaults::price_unspecified")]
    pub price_unspecified: String,
    #[serde(default = "defaults::price_label")]
    pub price: String,
    #[serde(default = "defaults::brand_label")]
    pub brand: String,
    #[serde(default = "defaults::condition_label")]
    pub condition: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            unavailable_marker: defaults::unavailable_marker(),
            unavailable_warning: defaults::unavailable_warning(),
            price_unspecified: defaults::price_unspecified(),
            price: defaults::price_label(),
            brand: defaults::brand_label(),
            condition: defaults::condition_label(),
        }
    }
}

/// One tracked search query and where its state and output live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedConfig {
    /// Identifier used on the command line
    pub id: String,

    /// Catalog search URL
    pub url: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Cache file path, relative to the storage root
    pub cache_file: String,

    /// Feed file path, relative to the output root
    pub feed_file: String,
}

mod defaults {
    use super::FeedConfig;

    // Scraper defaults
    pub fn base_url() -> String {
        "https://www.vinted.cz".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn feed_delay() -> u64 {
        5
    }
    pub fn enabled() -> bool {
        true
    }

    // Cache defaults
    pub fn max_age_days() -> i64 {
        30
    }
    pub fn max_items() -> usize {
        300
    }

    // Output defaults
    pub fn language() -> String {
        "cs".into()
    }
    pub fn feed_title_prefix() -> String {
        "Vinted - ".into()
    }

    // Label defaults
    pub fn unavailable_marker() -> String {
        "[PRODÁNO?]".into()
    }
    pub fn unavailable_warning() -> String {
        "⚠️ Možná nedostupné".into()
    }
    pub fn price_unspecified() -> String {
        "Cena neuvedena".into()
    }
    pub fn price_label() -> String {
        "Cena".into()
    }
    pub fn brand_label() -> String {
        "Značka".into()
    }
    pub fn condition_label() -> String {
        "Stav".into()
    }

    fn feed(id: &str, url: &str, title: &str, description: &str, file_stem: &str) -> FeedConfig {
        FeedConfig {
            id: id.to_string(),
            url: url.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            cache_file: format!("cache/{file_stem}.json"),
            feed_file: format!("docs/{file_stem}.xml"),
        }
    }

    // Feed defaults
    pub fn default_feeds() -> Vec<FeedConfig> {
        vec![
            feed(
                "lego-speed",
                "https://www.vinted.cz/catalog?search_text=lego%20speed&price_to=450.0&currency=CZK&order=newest_first",
                "LEGO Speed Champions",
                "LEGO Speed Champions do 450 Kč",
                "lego_speed",
            ),
            feed(
                "lego-technic-mix",
                "https://www.vinted.cz/catalog?search_text=technic%20mix&catalog[]=1767&search_id=27058343250&order=newest_first",
                "LEGO Technic mix",
                "LEGO Technic mix",
                "lego_technic_mix",
            ),
            feed(
                "lego-duplo",
                "https://www.vinted.cz/catalog?search_text=&catalog[]=1767&brand_ids[]=328531&search_id=26854064724&order=newest_first",
                "LEGO Duplo",
                "LEGO Duplo",
                "lego_duplo",
            ),
            feed(
                "lego-technic",
                "https://www.vinted.cz/catalog?search_text=lego%20technic&price_from=50.0&currency=CZK&search_id=20000401975&order=newest_first",
                "LEGO Technic",
                "LEGO Technic",
                "lego_technic",
            ),
            feed(
                "lego-kg",
                "https://www.vinted.cz/catalog?search_text=lego%20kg&price_from=50.0&currency=CZK&search_id=20549846549&order=newest_first",
                "LEGO KG",
                "LEGO KG",
                "lego_kg",
            ),
            feed(
                "lego-technic-kat",
                "https://www.vinted.cz/catalog?search_text=&catalog[]=1767&brand_ids[]=407093&search_id=21855804981&order=newest_first",
                "LEGO Technic kat",
                "LEGO Technic kat",
                "lego_technic_kat",
            ),
            feed(
                "lego-mix",
                "https://www.vinted.cz/catalog?search_text=lego%20mix&search_id=23708556687&order=newest_first",
                "LEGO mix",
                "LEGO mix",
                "lego_mix",
            ),
            feed(
                "lego-200-300",
                "https://www.vinted.cz/catalog?search_text=&catalog[]=1767&price_from=200.0&price_to=300.0&currency=CZK&brand_ids[]=89162&search_id=30666696637&order=newest_first",
                "LEGO 200-300",
                "LEGO 200 300",
                "lego_200_300",
            ),
            feed(
                "lego-kat",
                "https://www.vinted.cz/catalog?search_text=&catalog[]=1767&brand_ids[]=89162&search_id=30177685542&order=newest_first",
                "LEGO kat",
                "LEGO kat",
                "lego_kat",
            ),
        ]
    }
}
