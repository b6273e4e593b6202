pub mod browser;
pub mod http;
pub mod listing;
pub mod search;
pub mod traits;
pub mod types;

pub use browser::BrowserFetcher;
pub use http::HttpFetcher;
pub use search::{LocationReport, SearchOrchestrator};
pub use traits::DocumentFetcher;
pub use types::SearchFilters;
