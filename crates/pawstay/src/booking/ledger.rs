//! Authoritative reservation store.
//!
//! `commit` is the only path that grows the booking set. The conflict check
//! and the insert happen under a single per-property lock, so two racing
//! commits for the same property serialize deterministically — exactly one
//! wins — while commits for different properties never block each other.
//!
//! Checking availability first and inserting later as two separate steps is
//! the bug class this module exists to prevent; no such path is exposed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};

use super::domain::{
    AccountId, ConfirmationCode, GuestCounts, PropertyId, Reservation, ReservationId,
    ReservationStatus, StayRange,
};

/// Candidate row assembled by the lifecycle service. The ledger assigns the
/// reservation id and creation timestamp on a successful commit.
#[derive(Debug, Clone)]
pub struct ReservationDraft {
    pub confirmation_code: ConfirmationCode,
    pub property_id: PropertyId,
    pub guest_id: AccountId,
    pub stay: StayRange,
    pub guests: GuestCounts,
    pub price_per_night_cents: u32,
    pub total_price_cents: u64,
    pub status: ReservationStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("requested range {requested} overlaps an active reservation")]
    DateConflict {
        requested: StayRange,
        conflicts: Vec<StayRange>,
    },
    #[error("confirmation code already in use")]
    ConfirmationCollision,
    #[error("reservation not found")]
    NotFound,
    #[error("illegal transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
        reason: &'static str,
    },
    #[error("commit aborted: {0}")]
    Aborted(String),
}

/// The authoritative booking set and its status state machine.
///
/// Implementations must make `commit` atomic per property and must never
/// delete rows; cancellation and completion are terminal statuses.
pub trait ReservationLedger: Send + Sync {
    fn commit(&self, draft: ReservationDraft) -> Result<Reservation, LedgerError>;

    fn transition(
        &self,
        id: ReservationId,
        next: ReservationStatus,
        today: NaiveDate,
    ) -> Result<Reservation, LedgerError>;

    fn by_id(&self, id: ReservationId) -> Result<Option<Reservation>, LedgerError>;

    fn by_confirmation(&self, code: &ConfirmationCode)
        -> Result<Option<Reservation>, LedgerError>;

    /// Reservations for a guest, newest first, optionally filtered by status.
    fn for_guest(
        &self,
        guest: &AccountId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, LedgerError>;

    /// Reservations on a property ordered by check-in, optionally filtered.
    fn for_property(
        &self,
        property: &PropertyId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, LedgerError>;

    /// Stay ranges of the property's active (Confirmed or Pending) rows.
    fn active_stays(&self, property: &PropertyId) -> Result<Vec<StayRange>, LedgerError>;
}

/// Stored-status state machine. The derived display status plays no part.
fn check_transition(
    current: &Reservation,
    next: ReservationStatus,
    today: NaiveDate,
) -> Result<(), LedgerError> {
    use ReservationStatus::{Cancelled, Completed, Confirmed, Pending};

    let from = current.status;
    let reason = match (from, next) {
        (Confirmed, Cancelled) if today < current.stay.check_out => return Ok(()),
        (Confirmed, Cancelled) => "stay already ended",
        (Confirmed, Completed) if today >= current.stay.check_out => return Ok(()),
        (Confirmed, Completed) => "stay has not reached its check-out date",
        (Pending, Confirmed) | (Pending, Cancelled) => return Ok(()),
        (Cancelled, _) | (Completed, _) => "status is terminal",
        _ => "transition not in the state machine",
    };
    Err(LedgerError::InvalidTransition {
        from,
        to: next,
        reason,
    })
}

type PropertyBook = Arc<Mutex<Vec<Reservation>>>;

/// In-memory ledger: one mutexed book of rows per property, a global
/// uniqueness set for confirmation codes, and a sequential id counter.
pub struct InMemoryReservationLedger {
    books: Mutex<HashMap<PropertyId, PropertyBook>>,
    codes: Mutex<HashSet<ConfirmationCode>>,
    sequence: AtomicU64,
}

impl Default for InMemoryReservationLedger {
    fn default() -> Self {
        Self {
            books: Mutex::new(HashMap::new()),
            codes: Mutex::new(HashSet::new()),
            sequence: AtomicU64::new(1),
        }
    }
}

impl InMemoryReservationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn book(&self, property: &PropertyId) -> Result<PropertyBook, LedgerError> {
        let mut books = self
            .books
            .lock()
            .map_err(|_| LedgerError::Aborted("book index lock poisoned".to_string()))?;
        Ok(books.entry(property.clone()).or_default().clone())
    }

    fn all_books(&self) -> Result<Vec<PropertyBook>, LedgerError> {
        let books = self
            .books
            .lock()
            .map_err(|_| LedgerError::Aborted("book index lock poisoned".to_string()))?;
        Ok(books.values().cloned().collect())
    }
}

impl ReservationLedger for InMemoryReservationLedger {
    fn commit(&self, draft: ReservationDraft) -> Result<Reservation, LedgerError> {
        let book = self.book(&draft.property_id)?;
        let mut rows = book
            .lock()
            .map_err(|_| LedgerError::Aborted("property book lock poisoned".to_string()))?;

        // Conflict check and insert are indivisible while this lock is held.
        let conflicts: Vec<StayRange> = rows
            .iter()
            .filter(|row| row.status.is_active())
            .filter(|row| row.stay.overlaps(&draft.stay))
            .map(|row| row.stay)
            .collect();
        if !conflicts.is_empty() {
            return Err(LedgerError::DateConflict {
                requested: draft.stay,
                conflicts,
            });
        }

        {
            let mut codes = self
                .codes
                .lock()
                .map_err(|_| LedgerError::Aborted("code set lock poisoned".to_string()))?;
            if !codes.insert(draft.confirmation_code.clone()) {
                return Err(LedgerError::ConfirmationCollision);
            }
        }

        let reservation = Reservation {
            id: ReservationId(self.sequence.fetch_add(1, Ordering::Relaxed)),
            confirmation_code: draft.confirmation_code,
            property_id: draft.property_id,
            guest_id: draft.guest_id,
            stay: draft.stay,
            guests: draft.guests,
            price_per_night_cents: draft.price_per_night_cents,
            total_price_cents: draft.total_price_cents,
            status: draft.status,
            created_at: Utc::now(),
        };
        rows.push(reservation.clone());
        Ok(reservation)
    }

    fn transition(
        &self,
        id: ReservationId,
        next: ReservationStatus,
        today: NaiveDate,
    ) -> Result<Reservation, LedgerError> {
        for book in self.all_books()? {
            let mut rows = book
                .lock()
                .map_err(|_| LedgerError::Aborted("property book lock poisoned".to_string()))?;
            if let Some(row) = rows.iter_mut().find(|row| row.id == id) {
                check_transition(row, next, today)?;
                row.status = next;
                return Ok(row.clone());
            }
        }
        Err(LedgerError::NotFound)
    }

    fn by_id(&self, id: ReservationId) -> Result<Option<Reservation>, LedgerError> {
        for book in self.all_books()? {
            let rows = book
                .lock()
                .map_err(|_| LedgerError::Aborted("property book lock poisoned".to_string()))?;
            if let Some(row) = rows.iter().find(|row| row.id == id) {
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    fn by_confirmation(
        &self,
        code: &ConfirmationCode,
    ) -> Result<Option<Reservation>, LedgerError> {
        for book in self.all_books()? {
            let rows = book
                .lock()
                .map_err(|_| LedgerError::Aborted("property book lock poisoned".to_string()))?;
            if let Some(row) = rows.iter().find(|row| &row.confirmation_code == code) {
                return Ok(Some(row.clone()));
            }
        }
        Ok(None)
    }

    fn for_guest(
        &self,
        guest: &AccountId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, LedgerError> {
        let mut found = Vec::new();
        for book in self.all_books()? {
            let rows = book
                .lock()
                .map_err(|_| LedgerError::Aborted("property book lock poisoned".to_string()))?;
            found.extend(
                rows.iter()
                    .filter(|row| &row.guest_id == guest)
                    .filter(|row| status.map_or(true, |wanted| row.status == wanted))
                    .cloned(),
            );
        }
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }

    fn for_property(
        &self,
        property: &PropertyId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, LedgerError> {
        let book = self.book(property)?;
        let rows = book
            .lock()
            .map_err(|_| LedgerError::Aborted("property book lock poisoned".to_string()))?;
        let mut found: Vec<Reservation> = rows
            .iter()
            .filter(|row| status.map_or(true, |wanted| row.status == wanted))
            .cloned()
            .collect();
        found.sort_by_key(|row| row.stay.check_in);
        Ok(found)
    }

    fn active_stays(&self, property: &PropertyId) -> Result<Vec<StayRange>, LedgerError> {
        let book = self.book(property)?;
        let rows = book
            .lock()
            .map_err(|_| LedgerError::Aborted("property book lock poisoned".to_string()))?;
        Ok(rows
            .iter()
            .filter(|row| row.status.is_active())
            .map(|row| row.stay)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn draft(code: &str, check_in: NaiveDate, check_out: NaiveDate) -> ReservationDraft {
        ReservationDraft {
            confirmation_code: ConfirmationCode(code.to_string()),
            property_id: PropertyId("prop-1".to_string()),
            guest_id: AccountId("guest-1".to_string()),
            stay: StayRange::new(check_in, check_out).expect("valid range"),
            guests: GuestCounts {
                adults: 2,
                children: 0,
                infants: 0,
                pets: 1,
            },
            price_per_night_cents: 10_000,
            total_price_cents: 40_000,
            status: ReservationStatus::Confirmed,
        }
    }

    #[test]
    fn commit_assigns_sequential_ids() {
        let ledger = InMemoryReservationLedger::new();
        let first = ledger
            .commit(draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5)))
            .expect("first commit");
        let second = ledger
            .commit(draft("PS000002BBBB", date(2025, 9, 5), date(2025, 9, 8)))
            .expect("second commit");
        assert_eq!(first.id, ReservationId(1));
        assert_eq!(second.id, ReservationId(2));
    }

    #[test]
    fn overlapping_commit_is_rejected_with_the_conflicting_stays() {
        let ledger = InMemoryReservationLedger::new();
        ledger
            .commit(draft("PS000001AAAA", date(2025, 10, 1), date(2025, 10, 4)))
            .expect("seed commit");

        let err = ledger
            .commit(draft("PS000002BBBB", date(2025, 10, 3), date(2025, 10, 6)))
            .expect_err("overlap must be rejected");
        match err {
            LedgerError::DateConflict { conflicts, .. } => {
                assert_eq!(conflicts.len(), 1);
                assert_eq!(conflicts[0].check_in, date(2025, 10, 1));
            }
            other => panic!("expected DateConflict, got {other:?}"),
        }
    }

    #[test]
    fn adjacent_stays_share_the_boundary_date() {
        let ledger = InMemoryReservationLedger::new();
        ledger
            .commit(draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5)))
            .expect("first stay");
        ledger
            .commit(draft("PS000002BBBB", date(2025, 9, 5), date(2025, 9, 8)))
            .expect("back-to-back stay on the checkout day");
    }

    #[test]
    fn duplicate_confirmation_code_is_a_collision() {
        let ledger = InMemoryReservationLedger::new();
        ledger
            .commit(draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5)))
            .expect("first commit");
        let err = ledger
            .commit(draft("PS000001AAAA", date(2025, 11, 1), date(2025, 11, 5)))
            .expect_err("code reuse must fail");
        assert!(matches!(err, LedgerError::ConfirmationCollision));
    }

    #[test]
    fn cancelled_rows_free_their_range() {
        let ledger = InMemoryReservationLedger::new();
        let reservation = ledger
            .commit(draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5)))
            .expect("seed commit");
        ledger
            .transition(
                reservation.id,
                ReservationStatus::Cancelled,
                date(2025, 8, 20),
            )
            .expect("cancellation");

        ledger
            .commit(draft("PS000002BBBB", date(2025, 9, 1), date(2025, 9, 5)))
            .expect("cancelled range is bookable again");
    }

    #[test]
    fn completion_waits_for_checkout() {
        let ledger = InMemoryReservationLedger::new();
        let reservation = ledger
            .commit(draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5)))
            .expect("seed commit");

        let early = ledger
            .transition(
                reservation.id,
                ReservationStatus::Completed,
                date(2025, 9, 4),
            )
            .expect_err("completion before checkout");
        assert!(matches!(early, LedgerError::InvalidTransition { .. }));

        let done = ledger
            .transition(
                reservation.id,
                ReservationStatus::Completed,
                date(2025, 9, 5),
            )
            .expect("completion on the checkout day");
        assert_eq!(done.status, ReservationStatus::Completed);
    }

    #[test]
    fn cancellation_is_only_allowed_before_checkout() {
        let ledger = InMemoryReservationLedger::new();
        let reservation = ledger
            .commit(draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5)))
            .expect("seed commit");
        let err = ledger
            .transition(
                reservation.id,
                ReservationStatus::Cancelled,
                date(2025, 9, 5),
            )
            .expect_err("cancelling an ended stay");
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[test]
    fn pending_may_confirm_or_cancel() {
        let ledger = InMemoryReservationLedger::new();
        let mut pending = draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5));
        pending.status = ReservationStatus::Pending;
        let reservation = ledger.commit(pending).expect("pending commit");

        let confirmed = ledger
            .transition(
                reservation.id,
                ReservationStatus::Confirmed,
                date(2025, 8, 1),
            )
            .expect("pending -> confirmed");
        assert_eq!(confirmed.status, ReservationStatus::Confirmed);
    }

    #[test]
    fn terminal_statuses_reject_every_transition() {
        let ledger = InMemoryReservationLedger::new();
        let reservation = ledger
            .commit(draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5)))
            .expect("seed commit");
        ledger
            .transition(
                reservation.id,
                ReservationStatus::Cancelled,
                date(2025, 8, 20),
            )
            .expect("cancellation");

        for next in [
            ReservationStatus::Confirmed,
            ReservationStatus::Pending,
            ReservationStatus::Completed,
        ] {
            let err = ledger
                .transition(reservation.id, next, date(2025, 12, 1))
                .expect_err("terminal row must stay terminal");
            assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn pending_rows_still_block_the_calendar() {
        let ledger = InMemoryReservationLedger::new();
        let mut pending = draft("PS000001AAAA", date(2025, 9, 1), date(2025, 9, 5));
        pending.status = ReservationStatus::Pending;
        ledger.commit(pending).expect("pending commit");

        let err = ledger
            .commit(draft("PS000002BBBB", date(2025, 9, 2), date(2025, 9, 3)))
            .expect_err("pending stays are active");
        assert!(matches!(err, LedgerError::DateConflict { .. }));
    }

    #[test]
    fn unknown_reservation_is_not_found() {
        let ledger = InMemoryReservationLedger::new();
        let err = ledger
            .transition(
                ReservationId(99),
                ReservationStatus::Cancelled,
                date(2025, 9, 1),
            )
            .expect_err("nothing to transition");
        assert!(matches!(err, LedgerError::NotFound));
        assert!(ledger.by_id(ReservationId(99)).expect("lookup").is_none());
    }
}
