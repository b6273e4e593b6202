use thiserror::Error;

/// Failures a scout run can hit.
///
/// Only `Configuration` and `Persistence` abort a run. `Fetch` and `Parse`
/// are absorbed at the location or listing they belong to, and
/// `Notification` is logged after the ledger has already been written.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Invalid or missing configuration, raised before any fetch
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport failure or non-success status from the listing site
    #[error("Fetch error ({url}): {message}")]
    Fetch { url: String, message: String },

    /// A page could not be examined at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// The ledger could not be read or written
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The summary message could not be delivered
    #[error("Notification error: {0}")]
    Notification(String),
}

impl ScoutError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn fetch(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            url: url.into(),
            message: msg.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence(msg.into())
    }

    pub fn notification(msg: impl Into<String>) -> Self {
        Self::Notification(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
