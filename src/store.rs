use crate::error::{Result, ScoutError};
use crate::models::{Listing, PersistedRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Counts from one `add_listings` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    pub duplicates: usize,
}

/// Append-only ledger of listings, keyed by url.
///
/// Rows are never updated or removed. Whether a url has been seen before is
/// decided by the ledger alone.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// True if a row with exactly this url exists
    async fn exists(&self, url: &str) -> Result<bool>;

    async fn insert(&mut self, record: PersistedRecord) -> Result<()>;

    /// Name of the ledger, for summaries
    fn identifier(&self) -> String;

    /// Insert every listing whose url is not stored yet, in input order.
    async fn add_listings(&mut self, listings: &[Listing]) -> Result<WriteOutcome> {
        let mut outcome = WriteOutcome::default();
        for listing in listings {
            if self.exists(&listing.url).await? {
                debug!("Already stored: {}", listing.url);
                outcome.duplicates += 1;
                continue;
            }
            self.insert(PersistedRecord::from(listing)).await?;
            outcome.written += 1;
        }
        info!(
            "Wrote {} new listings to {} ({} already known)",
            outcome.written,
            self.identifier(),
            outcome.duplicates
        );
        Ok(outcome)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Sheet {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

/// Spreadsheet-shaped ledger kept in a JSON file: one header row and data
/// rows in `PersistedRecord::COLUMNS` order, newest first.
pub struct SheetStore {
    path: PathBuf,
    sheet: Sheet,
    urls: HashSet<String>,
}

impl SheetStore {
    /// Open the ledger at `path`, starting an empty one if the file does not
    /// exist yet.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let sheet = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str::<Sheet>(&raw).map_err(|e| {
                ScoutError::persistence(format!("{} is not a listing sheet: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("Starting a new listing sheet at {}", path.display());
                Sheet {
                    columns: PersistedRecord::COLUMNS.iter().map(|c| c.to_string()).collect(),
                    rows: Vec::new(),
                }
            }
            Err(e) => {
                return Err(ScoutError::persistence(format!(
                    "failed to read {}: {e}",
                    path.display()
                )))
            }
        };

        if sheet.columns != PersistedRecord::COLUMNS {
            return Err(ScoutError::persistence(format!(
                "{} has columns {:?}, expected {:?}",
                path.display(),
                sheet.columns,
                PersistedRecord::COLUMNS
            )));
        }

        let urls = sheet
            .rows
            .iter()
            .filter_map(|row| row.get(PersistedRecord::URL_COLUMN).cloned())
            .collect();

        debug!("Loaded {} rows from {}", sheet.rows.len(), path.display());
        Ok(Self { path, sheet, urls })
    }

    pub fn len(&self) -> usize {
        self.sheet.rows.len()
    }

    /// Write to a sibling file and rename it over the ledger, so a failed
    /// write leaves the previous version intact.
    async fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.sheet)
            .map_err(|e| ScoutError::persistence(format!("failed to encode sheet: {e}")))?;

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ScoutError::persistence(format!("failed to create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&staging, json)
            .await
            .map_err(|e| ScoutError::persistence(format!("failed to write {}: {e}", staging.display())))?;
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(ScoutError::persistence(format!(
                "failed to replace {}: {e}",
                self.path.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl ListingStore for SheetStore {
    async fn exists(&self, url: &str) -> Result<bool> {
        Ok(self.urls.contains(url))
    }

    async fn insert(&mut self, record: PersistedRecord) -> Result<()> {
        let url = record.url().to_string();
        // Newest rows go directly under the header
        self.sheet.rows.insert(0, record.into_cells());
        if let Err(e) = self.save().await {
            self.sheet.rows.remove(0);
            return Err(e);
        }
        self.urls.insert(url);
        Ok(())
    }

    fn identifier(&self) -> String {
        self.path.display().to_string()
    }
}
