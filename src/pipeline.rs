use crate::error::Result;
use crate::filter::AvailabilityFilter;
use crate::models::SearchLocation;
use crate::notify::{compose_message, Notifier};
use crate::scrapers::{LocationReport, SearchOrchestrator};
use crate::store::ListingStore;
use chrono::NaiveDate;
use std::fmt;
use tracing::{error, info};

/// What a run did, for the operator
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub locations: Vec<LocationReport>,
    pub scraped: usize,
    pub eligible: usize,
    pub written: usize,
    pub duplicates: usize,
    pub store: String,
    pub notified: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.locations {
            writeln!(f, "  {report}")?;
        }
        writeln!(f, "Unique listings scraped: {}", self.scraped)?;
        writeln!(f, "Eligible listings:       {}", self.eligible)?;
        writeln!(f, "Written to {}: {}", self.store, self.written)?;
        writeln!(f, "Already known:           {}", self.duplicates)?;
        write!(
            f,
            "Notification:            {}",
            if self.notified { "sent" } else { "not sent" }
        )
    }
}

/// Runs one scout pass: search every location, filter by availability,
/// record new listings in the ledger and report them.
pub struct Scout {
    orchestrator: SearchOrchestrator,
    filter: AvailabilityFilter,
    store: Box<dyn ListingStore>,
    notifier: Option<Box<dyn Notifier>>,
}

impl Scout {
    pub fn new(
        orchestrator: SearchOrchestrator,
        filter: AvailabilityFilter,
        store: Box<dyn ListingStore>,
        notifier: Option<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            orchestrator,
            filter,
            store,
            notifier,
        }
    }

    /// Run once. Only a ledger failure is returned as an error; failing
    /// locations, listings and notifications are logged and the run goes on.
    pub async fn run(&mut self, locations: &[SearchLocation], today: NaiveDate) -> Result<RunSummary> {
        let search = self.orchestrator.search(locations, today).await;
        let scraped = search.listings.len();
        info!("Scraped {} unique listings", scraped);

        let eligible = self.filter.apply(search.listings, today);
        info!("{} listings eligible", eligible.len());

        let outcome = self.store.add_listings(&eligible).await?;

        let mut summary = RunSummary {
            locations: search.reports,
            scraped,
            eligible: eligible.len(),
            written: outcome.written,
            duplicates: outcome.duplicates,
            store: self.store.identifier(),
            notified: false,
        };

        if summary.written == 0 {
            info!("Nothing new, no notification sent");
            return Ok(summary);
        }

        if let Some(notifier) = &self.notifier {
            let message = compose_message(
                summary.eligible,
                summary.written,
                summary.duplicates,
                &summary.store,
            );
            match notifier.dispatch(&message).await {
                Ok(()) => {
                    info!("Notified {}", notifier.recipient());
                    summary.notified = true;
                }
                Err(e) => error!("Failed to notify {}: {}", notifier.recipient(), e),
            }
        }

        Ok(summary)
    }
}
