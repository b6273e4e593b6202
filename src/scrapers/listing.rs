use crate::error::{Result, ScoutError};
use crate::models::{Availability, ListingDetails};
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Pulls the descriptive fields out of a single listing page.
///
/// Listing pages are inconsistent: agents leave out prices, stations or the
/// whole letting block. Every field has a default and nothing here fails on
/// missing markup.
pub struct ListingParser {
    title: Selector,
    price: Selector,
    address: Selector,
    stations: Selector,
    letting_terms: Selector,
}

impl ListingParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            title: selector("h1")?,
            price: selector("[data-testid=\"price\"], .property-header-price")?,
            address: selector("[itemprop=\"streetAddress\"]")?,
            stations: selector("#nearest-stations li .station-name")?,
            letting_terms: selector("#letting-details dt")?,
        })
    }

    pub fn parse(&self, html: &str) -> ListingDetails {
        let document = Html::parse_document(html);

        let title = first_text(&document, &self.title);
        let price = first_text(&document, &self.price);
        let address = first_text(&document, &self.address);

        let nearest_stations: Vec<String> = document
            .select(&self.stations)
            .map(element_text)
            .filter(|name| !name.is_empty())
            .collect();

        let letting = self.parse_letting(&document);

        debug!(
            "Parsed listing '{}' ({} stations, availability {:?})",
            title,
            nearest_stations.len(),
            letting.availability
        );

        ListingDetails {
            title,
            price,
            address,
            nearest_stations,
            availability: letting.availability,
            furnishing: letting.furnishing,
            deposit: letting.deposit,
        }
    }

    /// Read the `dt`/`dd` pairs of the letting block. A missing block leaves
    /// all three terms at their defaults.
    fn parse_letting(&self, document: &Html) -> LettingTerms {
        let mut terms = LettingTerms::default();

        for term in document.select(&self.letting_terms) {
            let label = element_text(term).to_lowercase();
            let label = label.trim_end_matches(':').trim();

            let value = term
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "dd")
                .map(element_text)
                .unwrap_or_default();

            if label.contains("available") {
                terms.availability = Availability::classify(&value);
            } else if label.contains("furnish") {
                terms.furnishing = non_empty(value);
            } else if label.contains("deposit") {
                terms.deposit = non_empty(value);
            }
        }

        terms
    }
}

#[derive(Debug, Default)]
struct LettingTerms {
    availability: Availability,
    furnishing: Option<String>,
    deposit: Option<String>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScoutError::Parse(format!("invalid selector {css}: {e}")))
}

/// Text content with whitespace runs collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, selector: &Selector) -> String {
    document
        .select(selector)
        .next()
        .map(element_text)
        .unwrap_or_default()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const FULL_PAGE: &str = r#"
        <html><body>
            <h1>2 bedroom flat to rent</h1>
            <div class="property-header-price"><span>£2,150 pcm</span></div>
            <address itemprop="streetAddress">Clapham Road,
                London, SW9</address>
            <ul id="nearest-stations">
                <li><span class="station-name">Stockwell</span><span>0.2 miles</span></li>
                <li><span class="station-name">Oval</span><span>0.4 miles</span></li>
            </ul>
            <section id="letting-details">
                <h2>Letting details</h2>
                <dl>
                    <div><dt>Let available date:</dt><dd>14/01/2027</dd></div>
                    <div><dt>Deposit:</dt><dd>£2,480</dd></div>
                    <div><dt>Min. Tenancy:</dt><dd>12 months</dd></div>
                    <div><dt>Furnish type:</dt><dd>Furnished</dd></div>
                </dl>
            </section>
        </body></html>
    "#;

    #[test]
    fn test_parse_full_listing() {
        let parser = ListingParser::new().unwrap();
        let details = parser.parse(FULL_PAGE);

        assert_eq!(details.title, "2 bedroom flat to rent");
        assert_eq!(details.price, "£2,150 pcm");
        assert_eq!(details.address, "Clapham Road, London, SW9");
        assert_eq!(details.nearest_stations, vec!["Stockwell", "Oval"]);
        assert_eq!(
            details.availability,
            Availability::Dated(NaiveDate::from_ymd_opt(2027, 1, 14).unwrap())
        );
        assert_eq!(details.furnishing.as_deref(), Some("Furnished"));
        assert_eq!(details.deposit.as_deref(), Some("£2,480"));
    }

    #[test]
    fn test_missing_letting_block_defaults() {
        let parser = ListingParser::new().unwrap();
        let details = parser.parse(
            r#"<html><body>
                <h1>Studio to rent</h1>
                <div data-testid="price">£1,300 pcm</div>
            </body></html>"#,
        );

        assert_eq!(details.title, "Studio to rent");
        assert_eq!(details.price, "£1,300 pcm");
        assert_eq!(details.address, "");
        assert!(details.nearest_stations.is_empty());
        assert_eq!(details.availability, Availability::Unspecified);
        assert_eq!(details.furnishing, None);
        assert_eq!(details.deposit, None);
    }

    #[test]
    fn test_empty_document_yields_defaults() {
        let parser = ListingParser::new().unwrap();
        assert_eq!(parser.parse(""), ListingDetails::default());
    }

    #[test]
    fn test_availability_now_and_malformed() {
        let parser = ListingParser::new().unwrap();
        let page = |value: &str| {
            format!(
                r#"<section id="letting-details"><dl>
                    <dt>Let available date:</dt><dd>{value}</dd>
                    <dt>Furnish type:</dt><dd></dd>
                </dl></section>"#
            )
        };

        let now = parser.parse(&page("now"));
        assert_eq!(now.availability, Availability::Immediate);
        assert_eq!(now.furnishing, None);

        let vague = parser.parse(&page("Ask agent"));
        assert_eq!(vague.availability, Availability::Unspecified);

        let blank = parser.parse(&page(""));
        assert_eq!(blank.availability, Availability::Unspecified);
    }
}
