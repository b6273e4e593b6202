use crate::error::{Result, ScoutError};
use crate::models::{Listing, SearchLocation};
use crate::scrapers::listing::{element_text, ListingParser};
use crate::scrapers::traits::DocumentFetcher;
use crate::scrapers::types::SearchFilters;
use chrono::NaiveDate;
use reqwest::Url;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What a result page yields: links to listing pages and the site's own
/// name for the searched location
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultsPage {
    pub location_name: Option<String>,
    pub listing_urls: Vec<String>,
}

/// Reads search result pages
pub struct ResultsPageParser {
    cards: Selector,
    location_input: Selector,
    heading: Selector,
}

impl ResultsPageParser {
    pub fn new() -> Result<Self> {
        let parse = |css: &str| {
            Selector::parse(css)
                .map_err(|e| ScoutError::Parse(format!("invalid selector {css}: {e}")))
        };
        Ok(Self {
            cards: parse("a.propertyCard-link")?,
            location_input: parse("input#searchLocation")?,
            heading: parse("h1.searchTitle-heading")?,
        })
    }

    /// Collect absolute listing URLs in page order. Fragments are dropped and
    /// a link repeated on the page (image and title of the same card) is kept
    /// once.
    pub fn parse(&self, html: &str, base: &Url) -> ResultsPage {
        let document = Html::parse_document(html);

        let location_name = document
            .select(&self.location_input)
            .next()
            .and_then(|input| input.value().attr("value"))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or_else(|| {
                document
                    .select(&self.heading)
                    .next()
                    .map(element_text)
                    .filter(|text| !text.is_empty())
            });

        let mut seen = HashSet::new();
        let mut listing_urls = Vec::new();
        for card in document.select(&self.cards) {
            let Some(href) = card.value().attr("href").map(str::trim) else {
                continue;
            };
            if href.is_empty() || href.starts_with('#') {
                continue;
            }
            let Ok(mut url) = base.join(href) else {
                debug!("Skipping unusable listing link: {}", href);
                continue;
            };
            url.set_fragment(None);
            let url = url.to_string();
            if seen.insert(url.clone()) {
                listing_urls.push(url);
            }
        }

        ResultsPage {
            location_name,
            listing_urls,
        }
    }
}

/// How a single location went
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Scraped { candidates: usize, listings: usize },
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationReport {
    pub name: String,
    pub resolved_name: Option<String>,
    pub outcome: LocationOutcome,
}

impl LocationReport {
    /// Listings this location contributed before run-wide deduplication
    pub fn listing_count(&self) -> usize {
        match self.outcome {
            LocationOutcome::Scraped { listings, .. } => listings,
            LocationOutcome::Skipped(_) => 0,
        }
    }
}

impl fmt::Display for LocationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(resolved) = &self.resolved_name {
            write!(f, " ({resolved})")?;
        }
        match &self.outcome {
            LocationOutcome::Scraped {
                candidates,
                listings,
            } => write!(f, ": {listings} listings from {candidates} links"),
            LocationOutcome::Skipped(reason) => write!(f, ": skipped, {reason}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct SearchOutcome {
    pub listings: Vec<Listing>,
    pub reports: Vec<LocationReport>,
}

/// Fans a search out over every configured location and gathers the
/// listings behind each result page.
///
/// Work is strictly sequential: one location at a time, one listing at a
/// time. A failing location or listing is logged and skipped.
pub struct SearchOrchestrator {
    fetcher: Box<dyn DocumentFetcher>,
    results: ResultsPageParser,
    listing: ListingParser,
    base_url: Url,
    search_path: String,
    filters: SearchFilters,
    request_delay: Duration,
}

impl SearchOrchestrator {
    pub fn new(
        fetcher: Box<dyn DocumentFetcher>,
        base_url: Url,
        search_path: impl Into<String>,
        filters: SearchFilters,
    ) -> Result<Self> {
        Ok(Self {
            fetcher,
            results: ResultsPageParser::new()?,
            listing: ListingParser::new()?,
            base_url,
            search_path: search_path.into(),
            filters,
            request_delay: Duration::ZERO,
        })
    }

    /// Wait this long after every fetch
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub async fn search(&self, locations: &[SearchLocation], scraped_on: NaiveDate) -> SearchOutcome {
        info!(
            "Searching {} locations with the {} fetcher",
            locations.len(),
            self.fetcher.fetcher_name()
        );

        let mut outcome = SearchOutcome::default();
        for location in locations {
            let report = self.search_location(location, scraped_on, &mut outcome.listings).await;
            info!("{}", report);
            outcome.reports.push(report);
        }

        let before: usize = outcome.reports.iter().map(LocationReport::listing_count).sum();
        outcome.listings = dedup_by_url(outcome.listings);
        if outcome.listings.len() < before {
            info!(
                "Dropped {} listings seen under more than one location",
                before - outcome.listings.len()
            );
        }

        outcome
    }

    async fn search_location(
        &self,
        location: &SearchLocation,
        scraped_on: NaiveDate,
        listings: &mut Vec<Listing>,
    ) -> LocationReport {
        let skipped = |reason: String| LocationReport {
            name: location.name.clone(),
            resolved_name: None,
            outcome: LocationOutcome::Skipped(reason),
        };

        let url = match self
            .filters
            .search_url(&self.base_url, &self.search_path, location)
        {
            Ok(url) => url,
            Err(e) => {
                warn!("Skipping location {}: {}", location.name, e);
                return skipped(e.to_string());
            }
        };

        let html = match self.fetch(url.as_str()).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Skipping location {}: {}", location.name, e);
                return skipped(e.to_string());
            }
        };

        let page = self.results.parse(&html, &self.base_url);
        match &page.location_name {
            Some(resolved) => info!("Location {} resolved to {}", location.name, resolved),
            None => debug!("Location {} has no resolved name on its result page", location.name),
        }

        let candidates = page.listing_urls.len();
        let mut found = 0;
        for listing_url in page.listing_urls {
            match self.fetch(&listing_url).await {
                Ok(html) => {
                    let details = self.listing.parse(&html);
                    listings.push(Listing::new(listing_url, scraped_on, details));
                    found += 1;
                }
                Err(e) => warn!("Dropping listing {}: {}", listing_url, e),
            }
        }

        LocationReport {
            name: location.name.clone(),
            resolved_name: page.location_name,
            outcome: LocationOutcome::Scraped {
                candidates,
                listings: found,
            },
        }
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let result = self.fetcher.fetch(url).await;
        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        result
    }
}

/// Keep the first listing for every url, preserving order
pub fn dedup_by_url(listings: Vec<Listing>) -> Vec<Listing> {
    let mut seen = HashSet::new();
    listings
        .into_iter()
        .filter(|listing| seen.insert(listing.url.clone()))
        .collect()
}
