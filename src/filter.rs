use crate::models::{Availability, Listing};
use chrono::{Days, NaiveDate};
use tracing::{debug, info};

/// Keeps listings that become available far enough in the future.
///
/// With a lead time of `n` weeks a listing passes only when it carries a
/// concrete date strictly after `today + n weeks`. Listings that are free
/// now, or give no date at all, never pass. Without a lead time every
/// listing passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvailabilityFilter {
    lead_time_weeks: Option<u32>,
}

impl AvailabilityFilter {
    pub fn new(lead_time_weeks: Option<u32>) -> Self {
        Self { lead_time_weeks }
    }

    /// First date that is too early to qualify, `None` when filtering is off
    pub fn cutoff(&self, today: NaiveDate) -> Option<NaiveDate> {
        let weeks = self.lead_time_weeks?;
        // Past the calendar range nothing can qualify; MAX excludes everything
        Some(
            today
                .checked_add_days(Days::new(u64::from(weeks) * 7))
                .unwrap_or(NaiveDate::MAX),
        )
    }

    /// `today` is taken once by the caller so the whole batch shares a cutoff.
    pub fn apply(&self, listings: Vec<Listing>, today: NaiveDate) -> Vec<Listing> {
        let Some(cutoff) = self.cutoff(today) else {
            debug!("No lead time configured, keeping all {} listings", listings.len());
            return listings;
        };

        let total = listings.len();
        let eligible: Vec<Listing> = listings
            .into_iter()
            .filter(|listing| match listing.availability {
                Availability::Dated(date) => date > cutoff,
                Availability::Immediate | Availability::Unspecified => false,
            })
            .collect();

        info!(
            "{} of {} listings available after {}",
            eligible.len(),
            total,
            cutoff
        );
        eligible
    }
}
