// src/services/catalog.rs

//! Catalog scraper service.
//!
//! Fetches a catalog search page and turns its listing tiles into
//! [`Observation`]s. Everything the tile exposes is read from the link's
//! `title` (or `aria-label`) text, which reads like
//! `"Technic 42115, značka: LEGO, stav: Nové, 1 200 Kč"`.

use std::collections::HashSet;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{MIN_TITLE_LEN, Observation, ScraperConfig};
use crate::utils::http::create_async_client;
use crate::utils::canonical_listing_url;

static ITEM_HREF: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/items/\d+").unwrap());
static TITLE_BEFORE_BRAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?),\s*značka:").unwrap());
static TITLE_BEFORE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?),\s*\d+").unwrap());
static BRAND: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"značka:\s*([^,]+)").unwrap());
static CONDITION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"stav:\s*([^,]+)").unwrap());
static SIZE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"velikost:\s*([^,]+)").unwrap());
static PRICE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+[,\s]?\d*)\s*Kč").unwrap());
static TILE_CONTAINER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"feed-grid|ItemBox|styles_container").unwrap());

/// How many ancestors are inspected when looking for a promoted block.
const PROMOTED_DEPTH: usize = 10;

/// Source of listing observations for a search query.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Scrape one search query page.
    async fn scrape(&self, query_url: &str) -> Result<Vec<Observation>>;
}

/// Scraper for marketplace catalog search pages.
pub struct CatalogScraper {
    client: Client,
    base_url: Url,
    skip_promoted: bool,
}

impl CatalogScraper {
    /// Create a new catalog scraper with the given configuration.
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            base_url: Url::parse(&config.base_url)?,
            skip_promoted: config.skip_promoted,
        })
    }

    /// Extract listing observations from a catalog page.
    pub fn parse_page(&self, html: &str) -> Result<Vec<Observation>> {
        parse_catalog(html, &self.base_url, self.skip_promoted)
    }
}

#[async_trait]
impl Scraper for CatalogScraper {
    async fn scrape(&self, query_url: &str) -> Result<Vec<Observation>> {
        log::info!("Fetching {}", query_url);
        let response = self
            .client
            .get(query_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::scrape(query_url, e))?;
        let html = response
            .text()
            .await
            .map_err(|e| AppError::scrape(query_url, e))?;

        let observations = self.parse_page(&html)?;
        log::info!("Scraped {} listings", observations.len());
        Ok(observations)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn parse_catalog(html: &str, base_url: &Url, skip_promoted: bool) -> Result<Vec<Observation>> {
    let document = Html::parse_document(html);
    let link_sel = parse_selector("a[href]")?;
    let img_sel = parse_selector("img")?;

    let mut seen = HashSet::new();
    let mut observations = Vec::new();
    let mut promoted = 0;

    for link in document.select(&link_sel) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        if !ITEM_HREF.is_match(href) {
            continue;
        }

        let url = canonical_listing_url(base_url, href);
        if !seen.insert(url.clone()) {
            continue;
        }
        if skip_promoted && is_promoted(&link) {
            promoted += 1;
            continue;
        }

        let label = link
            .value()
            .attr("title")
            .or_else(|| link.value().attr("aria-label"))
            .unwrap_or("");

        let mut observation = parse_listing_label(label);
        observation.url = url;
        observation.image = find_image(&link, &img_sel);

        // near-empty titles are never cached
        if observation
            .title
            .as_deref()
            .is_some_and(|t| t.trim().chars().count() > MIN_TITLE_LEN)
        {
            observations.push(observation);
        }
    }

    if promoted > 0 {
        log::debug!("Skipped {} promoted listings", promoted);
    }
    Ok(observations)
}

/// Whether the link sits inside a promoted closet block.
fn is_promoted(link: &ElementRef) -> bool {
    link.ancestors()
        .take(PROMOTED_DEPTH)
        .filter_map(|node| node.value().as_element())
        .any(|el| el.classes().any(|c| c.to_lowercase().contains("closet")))
}

/// First usable image in the listing tile.
fn find_image(link: &ElementRef, img_sel: &Selector) -> Option<String> {
    let container = link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| {
            el.value().name() == "div"
                && el.value().classes().any(|c| TILE_CONTAINER.is_match(c))
        })
        .or_else(|| link.parent().and_then(ElementRef::wrap))?;

    let img = container.select(img_sel).next()?;
    let attrs = img.value();

    let src = ["src", "data-src", "data-lazy-src"]
        .into_iter()
        .filter_map(|name| attrs.attr(name))
        .find(|value| !value.is_empty());
    if let Some(src) = src {
        if src.starts_with("http") && !src.to_lowercase().contains("placeholder") {
            return Some(src.to_string());
        }
    }

    attrs
        .attr("srcset")
        .and_then(|srcset| srcset.split(',').next())
        .and_then(|candidate| candidate.split_whitespace().next())
        .filter(|first| first.starts_with("http"))
        .map(str::to_string)
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse a listing tile label into an observation without URL or image.
pub fn parse_listing_label(label: &str) -> Observation {
    let label = label.trim();
    if label.is_empty() {
        return Observation::default();
    }

    let title = capture(&TITLE_BEFORE_BRAND, label)
        .or_else(|| capture(&TITLE_BEFORE_NUMBER, label))
        .unwrap_or_else(|| label.split(',').next().unwrap_or("").trim().to_string());

    Observation {
        url: String::new(),
        title: Some(title),
        price: capture(&PRICE, label).map(|amount| format!("{amount} Kč")),
        brand: capture(&BRAND, label),
        condition: capture(&CONDITION, label),
        size: capture(&SIZE, label),
        image: None,
    }
}
