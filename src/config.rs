use crate::error::{Result, ScoutError};
use crate::models::SearchLocation;
use crate::notify::{TwilioOptions, TWILIO_API_BASE};
use crate::scrapers::SearchFilters;
use reqwest::Url;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A bound that may be written as a JSON number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(serde_json::Number),
    Text(String),
}

impl RawNumber {
    fn text(&self) -> String {
        match self {
            RawNumber::Number(n) => n.to_string(),
            RawNumber::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawFilters {
    radius: Option<RawNumber>,
    min_price: Option<RawNumber>,
    max_price: Option<RawNumber>,
    min_bedrooms: Option<RawNumber>,
    max_bedrooms: Option<RawNumber>,
    #[serde(default)]
    furnish_types: Vec<String>,
    #[serde(default)]
    excluded_categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawNotification {
    to: String,
    from: String,
    api_base: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawStore {
    path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    base_url: String,
    #[serde(default = "default_search_path")]
    search_path: String,
    locations: Vec<SearchLocation>,
    filters: RawFilters,
    lead_time_weeks: Option<RawNumber>,
    notification: Option<RawNotification>,
    store: RawStore,
    #[serde(default)]
    fetcher: FetcherKind,
    timeout_secs: Option<u64>,
    request_delay_ms: Option<u64>,
}

fn default_search_path() -> String {
    "/property-to-rent/find.html".to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    #[default]
    Http,
    Browser,
}

/// Validated configuration for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: Url,
    pub search_path: String,
    pub locations: Vec<SearchLocation>,
    pub filters: SearchFilters,
    pub lead_time_weeks: Option<u32>,
    pub notification: Option<TwilioOptions>,
    pub store_path: PathBuf,
    pub fetcher: FetcherKind,
    pub timeout: Duration,
    pub request_delay: Duration,
}

impl Config {
    /// Load configuration from a JSON file. Twilio credentials come from the
    /// environment (a `.env` file is honoured).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScoutError::config(format!("failed to read {}: {e}", path.display())))?;

        let _ = dotenvy::dotenv();
        Self::from_json(&raw, |key| env::var(key).ok())
    }

    /// Parse and validate a JSON document, looking secrets up through `secret`.
    pub fn from_json(raw: &str, secret: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(raw)
            .map_err(|e| ScoutError::config(format!("invalid configuration: {e}")))?;

        let base_url = Url::parse(&raw.base_url)
            .map_err(|e| ScoutError::config(format!("invalid base_url {}: {e}", raw.base_url)))?;

        if raw.locations.is_empty() {
            return Err(ScoutError::config("no locations configured"));
        }
        for location in &raw.locations {
            validate_identifier(location)?;
        }

        let filters = SearchFilters {
            radius: optional_number(&raw.filters.radius, "radius")?,
            min_price: optional_number(&raw.filters.min_price, "min_price")?,
            max_price: optional_number(&raw.filters.max_price, "max_price")?,
            min_bedrooms: optional_number(&raw.filters.min_bedrooms, "min_bedrooms")?,
            max_bedrooms: optional_number(&raw.filters.max_bedrooms, "max_bedrooms")?,
            furnish_types: raw.filters.furnish_types,
            excluded_categories: raw.filters.excluded_categories,
        };
        check_range(filters.min_price, filters.max_price, "price")?;
        check_range(filters.min_bedrooms, filters.max_bedrooms, "bedrooms")?;
        if filters.radius.is_some_and(|r| !r.is_finite() || r < 0.0) {
            return Err(ScoutError::config("radius must be a non-negative number"));
        }

        let lead_time_weeks = optional_number(&raw.lead_time_weeks, "lead_time_weeks")?;

        let timeout_secs = raw.timeout_secs.unwrap_or(30);
        if timeout_secs == 0 {
            return Err(ScoutError::config("timeout_secs must be at least 1"));
        }

        let notification = match raw.notification {
            Some(notification) => {
                let account_sid = secret("TWILIO_ACCOUNT_SID")
                    .ok_or_else(|| ScoutError::config("TWILIO_ACCOUNT_SID must be set"))?;
                let auth_token = secret("TWILIO_AUTH_TOKEN")
                    .ok_or_else(|| ScoutError::config("TWILIO_AUTH_TOKEN must be set"))?;
                Some(TwilioOptions {
                    account_sid,
                    auth_token,
                    from: notification.from,
                    to: notification.to,
                    api_base: notification
                        .api_base
                        .unwrap_or_else(|| TWILIO_API_BASE.to_string()),
                })
            }
            None => None,
        };

        Ok(Self {
            base_url,
            search_path: raw.search_path,
            locations: raw.locations,
            filters,
            lead_time_weeks,
            notification,
            store_path: raw.store.path,
            fetcher: raw.fetcher,
            timeout: Duration::from_secs(timeout_secs),
            request_delay: Duration::from_millis(raw.request_delay_ms.unwrap_or(0)),
        })
    }
}

/// Identifiers are opaque, but must be safe to drop into a query string
fn validate_identifier(location: &SearchLocation) -> Result<()> {
    let id = &location.identifier;
    let allowed = |c: char| c.is_ascii_alphanumeric() || "^_-.:".contains(c);
    if id.is_empty() || !id.chars().all(allowed) {
        return Err(ScoutError::config(format!(
            "malformed identifier {:?} for location {}",
            id, location.name
        )));
    }
    Ok(())
}

fn optional_number<T: std::str::FromStr>(value: &Option<RawNumber>, field: &str) -> Result<Option<T>> {
    value
        .as_ref()
        .map(|raw| {
            let text = raw.text();
            text.parse::<T>()
                .map_err(|_| ScoutError::config(format!("{field} must be numeric, got {text:?}")))
        })
        .transpose()
}

fn check_range(min: Option<u32>, max: Option<u32>, what: &str) -> Result<()> {
    match (min, max) {
        (Some(min), Some(max)) if min > max => Err(ScoutError::config(format!(
            "minimum {what} {min} is above maximum {max}"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "base_url": "https://rentals.example.com",
        "locations": [
            {"name": "Clapham", "identifier": "REGION^87490"},
            {"name": "Brixton", "identifier": "STATION^1409"}
        ],
        "filters": {
            "radius": "0.0",
            "min_price": 1500,
            "max_price": "2500",
            "min_bedrooms": 1,
            "max_bedrooms": 2,
            "furnish_types": ["furnished"],
            "excluded_categories": ["houseShare", "student"]
        },
        "lead_time_weeks": 7,
        "notification": {"to": "+15550000002", "from": "+15550000001"},
        "store": {"path": "listings.json"}
    }"#;

    fn secrets(key: &str) -> Option<String> {
        match key {
            "TWILIO_ACCOUNT_SID" => Some("AC123".to_string()),
            "TWILIO_AUTH_TOKEN" => Some("secret".to_string()),
            _ => None,
        }
    }

    fn with_filters(filters: &str) -> String {
        format!(
            r#"{{
                "base_url": "https://rentals.example.com",
                "locations": [{{"name": "Clapham", "identifier": "REGION^87490"}}],
                "filters": {filters},
                "store": {{"path": "listings.json"}}
            }}"#
        )
    }

    #[test]
    fn test_valid_config() {
        let config = Config::from_json(VALID, secrets).unwrap();

        assert_eq!(config.locations.len(), 2);
        assert_eq!(config.locations[1].identifier, "STATION^1409");
        assert_eq!(config.filters.radius, Some(0.0));
        assert_eq!(config.filters.min_price, Some(1500));
        assert_eq!(config.filters.max_price, Some(2500));
        assert_eq!(config.lead_time_weeks, Some(7));
        assert_eq!(config.search_path, "/property-to-rent/find.html");
        assert_eq!(config.fetcher, FetcherKind::Http);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.request_delay, Duration::ZERO);

        let notification = config.notification.unwrap();
        assert_eq!(notification.account_sid, "AC123");
        assert_eq!(notification.api_base, TWILIO_API_BASE);
    }

    #[test]
    fn test_optional_sections_may_be_absent() {
        let config = Config::from_json(&with_filters("{}"), |_| None).unwrap();

        assert_eq!(config.lead_time_weeks, None);
        assert!(config.notification.is_none());
        assert_eq!(config.filters, SearchFilters::default());
    }

    #[test]
    fn test_malformed_identifier_is_rejected() {
        for identifier in ["", "REGION 87490", "REGION^1&x=2", "ÅREA^1"] {
            let raw = VALID.replace("REGION^87490", identifier);
            let err = Config::from_json(&raw, secrets).unwrap_err();
            assert!(matches!(err, ScoutError::Configuration(_)), "{identifier}");
        }
    }

    #[test]
    fn test_non_numeric_bound_is_rejected() {
        let err = Config::from_json(&with_filters(r#"{"max_price": "lots"}"#), |_| None).unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));

        let err = Config::from_json(&with_filters(r#"{"min_bedrooms": 1.5}"#), |_| None).unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));

        let err = Config::from_json(&with_filters(r#"{"radius": "far"}"#), |_| None).unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let err = Config::from_json(
            &with_filters(r#"{"min_price": 3000, "max_price": 2000}"#),
            |_| None,
        )
        .unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));
    }

    #[test]
    fn test_notification_without_credentials_is_rejected() {
        let err = Config::from_json(VALID, |_| None).unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));
    }

    #[test]
    fn test_fetcher_and_timing_settings() {
        let raw = VALID.replace(
            r#""store": {"path": "listings.json"}"#,
            r#""store": {"path": "listings.json"},
               "fetcher": "browser",
               "timeout_secs": 12,
               "request_delay_ms": 500"#,
        );
        let config = Config::from_json(&raw, secrets).unwrap();

        assert_eq!(config.fetcher, FetcherKind::Browser);
        assert_eq!(config.timeout, Duration::from_secs(12));
        assert_eq!(config.request_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let raw = VALID.replace(
            r#""store": {"path": "listings.json"}"#,
            r#""store": {"path": "listings.json"}, "timeout_secs": 0"#,
        );
        let err = Config::from_json(&raw, secrets).unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));
    }

    #[test]
    fn test_unknown_fetcher_is_rejected() {
        let raw = VALID.replace(
            r#""store": {"path": "listings.json"}"#,
            r#""store": {"path": "listings.json"}, "fetcher": "curl""#,
        );
        let err = Config::from_json(&raw, secrets).unwrap_err();
        assert!(matches!(err, ScoutError::Configuration(_)));
    }
}
