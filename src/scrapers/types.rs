use crate::error::{Result, ScoutError};
use crate::models::SearchLocation;
use reqwest::Url;

/// Search parameters shared by every location in a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchFilters {
    /// Search radius in miles around the location
    pub radius: Option<f64>,
    /// Minimum monthly rent
    pub min_price: Option<u32>,
    /// Maximum monthly rent
    pub max_price: Option<u32>,
    /// Minimum number of bedrooms
    pub min_bedrooms: Option<u32>,
    /// Maximum number of bedrooms
    pub max_bedrooms: Option<u32>,
    /// Furnishing types to include, e.g. "furnished", "partFurnished"
    pub furnish_types: Vec<String>,
    /// Listing categories to leave out, e.g. "houseShare", "student"
    pub excluded_categories: Vec<String>,
}

impl SearchFilters {
    /// Query pairs for the shared filters, in a stable order
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        if let Some(radius) = self.radius {
            pairs.push(("radius".to_string(), format!("{radius:.1}")));
        }
        let bounds = [
            ("minPrice", self.min_price),
            ("maxPrice", self.max_price),
            ("minBedrooms", self.min_bedrooms),
            ("maxBedrooms", self.max_bedrooms),
        ];
        for (key, value) in bounds {
            if let Some(value) = value {
                pairs.push((key.to_string(), value.to_string()));
            }
        }
        if !self.furnish_types.is_empty() {
            pairs.push(("furnishTypes".to_string(), self.furnish_types.join(",")));
        }
        if !self.excluded_categories.is_empty() {
            pairs.push(("dontShow".to_string(), self.excluded_categories.join(",")));
        }
        pairs
    }

    /// Build the result page URL for one location.
    ///
    /// Works on its own copy of the query pairs; the shared filters are
    /// never touched, so every location starts from the same set.
    pub fn search_url(&self, base: &Url, path: &str, location: &SearchLocation) -> Result<Url> {
        let endpoint = base
            .join(path)
            .map_err(|e| ScoutError::config(format!("invalid search path {path}: {e}")))?;

        let mut pairs = self.query_pairs();
        pairs.push(("locationIdentifier".to_string(), location.identifier.clone()));

        Url::parse_with_params(endpoint.as_str(), &pairs)
            .map_err(|e| ScoutError::config(format!("invalid search URL for {}: {e}", location.name)))
    }
}
