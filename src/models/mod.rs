use chrono::NaiveDate;
use serde::Deserialize;
use std::fmt;

/// Day/month/year, the only date layout the letting details use
pub const AVAILABILITY_DATE_FORMAT: &str = "%d/%m/%Y";

/// When a property can be moved into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Availability {
    #[default]
    Unspecified,
    Immediate,
    Dated(NaiveDate),
}

impl Availability {
    /// Classify the raw "let available date" text of a listing.
    ///
    /// Empty text is unspecified, "now" in any case is immediate and anything
    /// else must be a `dd/mm/yyyy` date. Text that is none of these degrades to
    /// unspecified instead of failing.
    pub fn classify(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Availability::Unspecified;
        }
        if text.eq_ignore_ascii_case("now") {
            return Availability::Immediate;
        }
        match NaiveDate::parse_from_str(text, AVAILABILITY_DATE_FORMAT) {
            Ok(date) => Availability::Dated(date),
            Err(_) => Availability::Unspecified,
        }
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Availability::Unspecified => Ok(()),
            Availability::Immediate => f.write_str("Now"),
            Availability::Dated(date) => write!(f, "{}", date.format(AVAILABILITY_DATE_FORMAT)),
        }
    }
}

/// Descriptive fields pulled off a single listing page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingDetails {
    pub title: String,
    pub price: String,
    pub address: String,
    pub nearest_stations: Vec<String>,
    pub availability: Availability,
    pub furnishing: Option<String>,
    pub deposit: Option<String>,
}

/// One rental property discovered on the site.
///
/// `url` is the identity of the listing: two values with the same url are the
/// same property, within a run and across runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub url: String,
    pub scraped_on: NaiveDate,
    pub title: String,
    pub price: String,
    pub address: String,
    pub nearest_stations: Vec<String>,
    pub availability: Availability,
    pub furnishing: Option<String>,
    pub deposit: Option<String>,
}

impl Listing {
    pub fn new(url: impl Into<String>, scraped_on: NaiveDate, details: ListingDetails) -> Self {
        Self {
            url: url.into(),
            scraped_on,
            title: details.title,
            price: details.price,
            address: details.address,
            nearest_stations: details.nearest_stations,
            availability: details.availability,
            furnishing: details.furnishing,
            deposit: details.deposit,
        }
    }
}

/// A named place to search, identified by the site's own opaque token
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SearchLocation {
    pub name: String,
    pub identifier: String,
}

/// The row written to the ledger for a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    cells: Vec<String>,
}

impl PersistedRecord {
    /// Column order of every ledger row
    pub const COLUMNS: [&'static str; 9] = [
        "url",
        "scraped_on",
        "title",
        "price",
        "address",
        "nearest_stations",
        "availability",
        "furnishing",
        "deposit",
    ];

    /// Index of the url column within `COLUMNS`
    pub const URL_COLUMN: usize = 0;

    pub fn url(&self) -> &str {
        &self.cells[Self::URL_COLUMN]
    }

    pub fn into_cells(self) -> Vec<String> {
        self.cells
    }
}

impl From<&Listing> for PersistedRecord {
    fn from(listing: &Listing) -> Self {
        let cells = vec![
            listing.url.clone(),
            listing.scraped_on.format("%Y-%m-%d").to_string(),
            listing.title.clone(),
            listing.price.clone(),
            listing.address.clone(),
            listing.nearest_stations.join(", "),
            listing.availability.to_string(),
            listing.furnishing.clone().unwrap_or_default(),
            listing.deposit.clone().unwrap_or_default(),
        ];
        Self { cells }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_classify_availability() {
        assert_eq!(Availability::classify(""), Availability::Unspecified);
        assert_eq!(Availability::classify("   "), Availability::Unspecified);
        assert_eq!(Availability::classify("Now"), Availability::Immediate);
        assert_eq!(Availability::classify(" NOW "), Availability::Immediate);
        assert_eq!(
            Availability::classify("03/02/2027"),
            Availability::Dated(date(2027, 2, 3))
        );
    }

    #[test]
    fn test_classify_malformed_date_degrades() {
        assert_eq!(Availability::classify("Ask agent"), Availability::Unspecified);
        assert_eq!(Availability::classify("31/02/2027"), Availability::Unspecified);
        assert_eq!(Availability::classify("2027-02-03"), Availability::Unspecified);
    }

    #[test]
    fn test_record_projection_order() {
        let listing = Listing::new(
            "https://example.com/properties/1",
            date(2026, 10, 19),
            ListingDetails {
                title: "2 bedroom flat".to_string(),
                price: "£2,000 pcm".to_string(),
                address: "Clapham Road, London".to_string(),
                nearest_stations: vec!["Stockwell".to_string(), "Oval".to_string()],
                availability: Availability::Dated(date(2027, 1, 5)),
                furnishing: Some("Furnished".to_string()),
                deposit: None,
            },
        );

        let record = PersistedRecord::from(&listing);
        assert_eq!(record.url(), "https://example.com/properties/1");
        let cells = record.into_cells();
        assert_eq!(cells.len(), PersistedRecord::COLUMNS.len());
        assert_eq!(
            cells,
            [
                "https://example.com/properties/1",
                "2026-10-19",
                "2 bedroom flat",
                "£2,000 pcm",
                "Clapham Road, London",
                "Stockwell, Oval",
                "05/01/2027",
                "Furnished",
                "",
            ]
        );
    }
}
