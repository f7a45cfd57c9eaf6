//! Pure availability reads over the ledger.
//!
//! Nothing here mutates state, and nothing here is authoritative: the commit
//! path re-checks under the property lock. These reads exist for fast
//! user-facing rejections and calendar rendering.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;

use super::domain::{PropertyId, StayRange};
use super::ledger::{LedgerError, ReservationLedger};

/// Read-side view answering "is this range free" and "which days are blocked".
pub struct AvailabilityIndex<L> {
    ledger: Arc<L>,
}

impl<L: ReservationLedger> AvailabilityIndex<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        Self { ledger }
    }

    /// Active stays on the property that overlap the requested range.
    pub fn conflicts(
        &self,
        property: &PropertyId,
        requested: &StayRange,
    ) -> Result<Vec<StayRange>, LedgerError> {
        Ok(self
            .ledger
            .active_stays(property)?
            .into_iter()
            .filter(|stay| stay.overlaps(requested))
            .collect())
    }

    /// Advisory check; the authoritative test runs inside the commit.
    pub fn is_range_free(
        &self,
        property: &PropertyId,
        requested: &StayRange,
    ) -> Result<bool, LedgerError> {
        Ok(self.conflicts(property, requested)?.is_empty())
    }

    /// Every day occupied by an active stay, de-duplicated, ascending.
    /// Checkout days are excluded, so they remain offerable as check-ins.
    pub fn blocked_dates(&self, property: &PropertyId) -> Result<Vec<NaiveDate>, LedgerError> {
        let mut days = BTreeSet::new();
        for stay in self.ledger.active_stays(property)? {
            days.extend(stay.occupied_days());
        }
        Ok(days.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::domain::{
        AccountId, ConfirmationCode, GuestCounts, ReservationStatus,
    };
    use crate::booking::ledger::{InMemoryReservationLedger, ReservationDraft};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn range(check_in: NaiveDate, check_out: NaiveDate) -> StayRange {
        StayRange::new(check_in, check_out).expect("valid range")
    }

    fn seeded_index() -> (AvailabilityIndex<InMemoryReservationLedger>, PropertyId) {
        let ledger = Arc::new(InMemoryReservationLedger::new());
        let property = PropertyId("prop-1".to_string());
        for (code, check_in, check_out) in [
            ("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5)),
            ("PS000002BBBB", date(2025, 9, 10), date(2025, 9, 12)),
        ] {
            ledger
                .commit(ReservationDraft {
                    confirmation_code: ConfirmationCode(code.to_string()),
                    property_id: property.clone(),
                    guest_id: AccountId("guest-1".to_string()),
                    stay: range(check_in, check_out),
                    guests: GuestCounts {
                        adults: 1,
                        children: 0,
                        infants: 0,
                        pets: 0,
                    },
                    price_per_night_cents: 10_000,
                    total_price_cents: 40_000,
                    status: ReservationStatus::Confirmed,
                })
                .expect("seed commit");
        }
        (AvailabilityIndex::new(ledger), property)
    }

    #[test]
    fn range_free_iff_no_active_overlap() {
        let (index, property) = seeded_index();

        assert!(!index
            .is_range_free(&property, &range(date(2025, 9, 3), date(2025, 9, 6)))
            .expect("query"));
        assert!(index
            .is_range_free(&property, &range(date(2025, 9, 5), date(2025, 9, 10)))
            .expect("gap between stays, boundaries shared"));
    }

    #[test]
    fn conflicts_lists_only_overlapping_stays() {
        let (index, property) = seeded_index();
        let conflicts = index
            .conflicts(&property, &range(date(2025, 9, 4), date(2025, 9, 11)))
            .expect("query");
        assert_eq!(conflicts.len(), 2);
    }

    #[test]
    fn blocked_dates_are_sorted_and_exclude_checkouts() {
        let (index, property) = seeded_index();
        let blocked = index.blocked_dates(&property).expect("query");
        assert_eq!(
            blocked,
            vec![
                date(2025, 9, 1),
                date(2025, 9, 2),
                date(2025, 9, 3),
                date(2025, 9, 4),
                date(2025, 9, 10),
                date(2025, 9, 11),
            ]
        );
    }

    #[test]
    fn unknown_property_has_an_open_calendar() {
        let (index, _) = seeded_index();
        let other = PropertyId("prop-2".to_string());
        assert!(index.blocked_dates(&other).expect("query").is_empty());
        assert!(index
            .is_range_free(&other, &range(date(2025, 9, 1), date(2025, 9, 5)))
            .expect("query"));
    }
}
