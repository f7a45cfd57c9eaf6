//! Booking lifecycle orchestration.
//!
//! `BookingLifecycleService` is the only entry point the HTTP layer talks to:
//! it validates the typed request at the boundary, consults the directory and
//! catalog, fixes prices, and hands a draft to the ledger's atomic commit.
//! Status changes re-validate the acting account before delegating legality
//! to the ledger's state machine.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::availability::AvailabilityIndex;
use super::confirmation::ConfirmationCodeGenerator;
use super::directory::{AccountDirectory, DirectoryError, PropertyCatalog, PropertySnapshot};
use super::domain::{
    AccountId, ConfirmationCode, GuestCounts, PropertyId, Reservation, ReservationId,
    ReservationStatus, StayRange,
};
use super::ledger::{LedgerError, ReservationDraft, ReservationLedger};

/// Bounded regeneration attempts when the ledger reports a code collision.
const CODE_RETRY_LIMIT: usize = 3;

/// Source of "today" for precondition checks and transition gating.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock dates in the server's local timezone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Pinned date, for tests and scripted demos.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Strongly-typed booking request, validated before any core call so the
/// engine never sees shape-shifting input.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub guest_id: AccountId,
    pub property_id: PropertyId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
    #[serde(default)]
    pub pets: u32,
}

/// Locally detected request faults. Never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("check-in date cannot be in the past")]
    CheckInPast,
    #[error("check-out date must be after check-in date")]
    CheckOutNotAfterCheckIn,
    #[error("at least one adult is required")]
    NoAdults,
    #[error("{pets} pet(s) requested but the property allows at most {max_pets}")]
    TooManyPets { pets: u32, max_pets: u32 },
}

/// Why an account may not make or manage a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IneligibleAccount {
    #[error("host accounts cannot make guest bookings")]
    HostCannotBook,
    #[error("property is not currently bookable")]
    PropertyNotBookable,
    #[error("account is not permitted to manage this reservation")]
    NotAuthorized,
}

/// Discriminated booking failures. The HTTP layer must be able to tell
/// "dates unavailable" (an expected outcome) from a system fault.
#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("guest account not found")]
    GuestNotFound,
    #[error("property not found")]
    PropertyNotFound,
    #[error("reservation not found")]
    ReservationNotFound,
    #[error(transparent)]
    Ineligible(#[from] IneligibleAccount),
    #[error("requested dates {requested} are unavailable")]
    DateConflict {
        requested: StayRange,
        conflicts: Vec<StayRange>,
    },
    #[error("illegal transition {from} -> {to}: {reason}")]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
        reason: &'static str,
    },
    #[error("could not allocate a unique confirmation code")]
    ConfirmationExhausted,
    #[error("booking storage unavailable: {0}")]
    Storage(String),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl From<LedgerError> for BookingError {
    fn from(value: LedgerError) -> Self {
        match value {
            LedgerError::DateConflict {
                requested,
                conflicts,
            } => Self::DateConflict {
                requested,
                conflicts,
            },
            // Collisions are retried before this conversion ever runs.
            LedgerError::ConfirmationCollision => Self::ConfirmationExhausted,
            LedgerError::NotFound => Self::ReservationNotFound,
            LedgerError::InvalidTransition { from, to, reason } => Self::InvalidTransition {
                from,
                to,
                reason,
            },
            LedgerError::Aborted(detail) => Self::Storage(detail),
        }
    }
}

/// Availability answer shaped by what the caller asked for: a verdict on a
/// specific range, or the blocked days of the whole calendar.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AvailabilityReport {
    Range {
        is_available: bool,
        conflicts: Vec<StayRange>,
    },
    Calendar {
        blocked_dates: Vec<NaiveDate>,
    },
}

/// Orchestrates guest-facing creation, host-facing transitions, and reads,
/// composing the ledger, catalog, directory, and code generator.
pub struct BookingLifecycleService<L, P, D, G> {
    ledger: Arc<L>,
    availability: AvailabilityIndex<L>,
    catalog: Arc<P>,
    directory: Arc<D>,
    codes: Arc<G>,
    clock: Arc<dyn Clock>,
}

impl<L, P, D, G> BookingLifecycleService<L, P, D, G>
where
    L: ReservationLedger + 'static,
    P: PropertyCatalog + 'static,
    D: AccountDirectory + 'static,
    G: ConfirmationCodeGenerator + 'static,
{
    pub fn new(
        ledger: Arc<L>,
        catalog: Arc<P>,
        directory: Arc<D>,
        codes: Arc<G>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            availability: AvailabilityIndex::new(ledger.clone()),
            ledger,
            catalog,
            directory,
            codes,
            clock,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn availability(&self) -> &AvailabilityIndex<L> {
        &self.availability
    }

    /// Create a confirmed reservation, or explain precisely why not.
    ///
    /// Preconditions run in a fixed order so each failure is independently
    /// observable: dates first, then the guest, then the property, then the
    /// calendar. The calendar read here is advisory; the commit re-checks
    /// under the property lock.
    pub fn create_reservation(
        &self,
        request: ReservationRequest,
    ) -> Result<Reservation, BookingError> {
        let today = self.clock.today();
        if request.check_in < today {
            return Err(ValidationError::CheckInPast.into());
        }
        let stay = StayRange::new(request.check_in, request.check_out)
            .map_err(|_| ValidationError::CheckOutNotAfterCheckIn)?;

        let guests = GuestCounts {
            adults: request.adults,
            children: request.children,
            infants: request.infants,
            pets: request.pets,
        };
        if guests.adults == 0 {
            return Err(ValidationError::NoAdults.into());
        }

        let account = self
            .directory
            .account(&request.guest_id)?
            .ok_or(BookingError::GuestNotFound)?;
        if !account.may_book() {
            return Err(IneligibleAccount::HostCannotBook.into());
        }

        let property = self
            .catalog
            .property(&request.property_id)?
            .ok_or(BookingError::PropertyNotFound)?;
        if !property.is_bookable() {
            return Err(IneligibleAccount::PropertyNotBookable.into());
        }
        if guests.pets > property.max_pets {
            return Err(ValidationError::TooManyPets {
                pets: guests.pets,
                max_pets: property.max_pets,
            }
            .into());
        }

        let conflicts = self.availability.conflicts(&request.property_id, &stay)?;
        if !conflicts.is_empty() {
            return Err(BookingError::DateConflict {
                requested: stay,
                conflicts,
            });
        }

        self.commit_with_retries(&request, stay, guests, &property)
    }

    fn commit_with_retries(
        &self,
        request: &ReservationRequest,
        stay: StayRange,
        guests: GuestCounts,
        property: &PropertySnapshot,
    ) -> Result<Reservation, BookingError> {
        let total_price_cents =
            u64::from(property.nightly_rate_cents) * u64::from(stay.nights());
        let mut collisions = 0;
        let mut abort_retried = false;

        loop {
            let draft = ReservationDraft {
                confirmation_code: self.codes.next(),
                property_id: request.property_id.clone(),
                guest_id: request.guest_id.clone(),
                stay,
                guests,
                price_per_night_cents: property.nightly_rate_cents,
                total_price_cents,
                status: ReservationStatus::Confirmed,
            };

            match self.ledger.commit(draft) {
                Ok(reservation) => {
                    info!(
                        reservation = %reservation.id,
                        confirmation = %reservation.confirmation_code,
                        property = %reservation.property_id,
                        stay = %reservation.stay,
                        "reservation committed"
                    );
                    return Ok(reservation);
                }
                Err(LedgerError::ConfirmationCollision) => {
                    collisions += 1;
                    if collisions >= CODE_RETRY_LIMIT {
                        warn!(
                            property = %request.property_id,
                            attempts = collisions,
                            "confirmation code generator kept colliding"
                        );
                        return Err(BookingError::ConfirmationExhausted);
                    }
                }
                Err(LedgerError::Aborted(detail)) if !abort_retried => {
                    // An aborted commit persisted nothing, so one replay is safe.
                    abort_retried = true;
                    warn!(%detail, "commit aborted by storage, retrying once");
                }
                Err(other) => return Err(other.into()),
            }
        }
    }

    /// Host- or guest-initiated status change. Authorization is re-validated
    /// here; the legality of the transition itself belongs to the ledger.
    pub fn transition_status(
        &self,
        actor: &AccountId,
        id: ReservationId,
        next: ReservationStatus,
    ) -> Result<Reservation, BookingError> {
        let reservation = self
            .ledger
            .by_id(id)?
            .ok_or(BookingError::ReservationNotFound)?;
        self.authorize_transition(actor, &reservation, next)?;

        let updated = self.ledger.transition(id, next, self.clock.today())?;
        info!(
            reservation = %updated.id,
            status = %updated.status,
            "reservation status changed"
        );
        Ok(updated)
    }

    pub fn cancel(
        &self,
        actor: &AccountId,
        id: ReservationId,
    ) -> Result<Reservation, BookingError> {
        self.transition_status(actor, id, ReservationStatus::Cancelled)
    }

    pub fn complete(
        &self,
        actor: &AccountId,
        id: ReservationId,
    ) -> Result<Reservation, BookingError> {
        self.transition_status(actor, id, ReservationStatus::Completed)
    }

    /// The guest may cancel their own reservation; the property's host may
    /// confirm, complete, or cancel anything on their own property.
    fn authorize_transition(
        &self,
        actor: &AccountId,
        reservation: &Reservation,
        next: ReservationStatus,
    ) -> Result<(), BookingError> {
        if next == ReservationStatus::Cancelled && actor == &reservation.guest_id {
            return Ok(());
        }
        let property = self
            .catalog
            .property(&reservation.property_id)?
            .ok_or(BookingError::PropertyNotFound)?;
        if actor == &property.host_id {
            return Ok(());
        }
        Err(IneligibleAccount::NotAuthorized.into())
    }

    pub fn reservation_by_confirmation(
        &self,
        code: &ConfirmationCode,
    ) -> Result<Reservation, BookingError> {
        self.ledger
            .by_confirmation(code)?
            .ok_or(BookingError::ReservationNotFound)
    }

    /// A guest's reservations, newest first. `upcoming` narrows to confirmed
    /// stays checking in today or later, ascending by check-in.
    pub fn reservations_for_guest(
        &self,
        guest: &AccountId,
        status: Option<ReservationStatus>,
        upcoming: bool,
    ) -> Result<Vec<Reservation>, BookingError> {
        self.directory
            .account(guest)?
            .ok_or(BookingError::GuestNotFound)?;
        let mut rows = self.ledger.for_guest(guest, status)?;
        if upcoming {
            let today = self.clock.today();
            rows.retain(|row| {
                row.status == ReservationStatus::Confirmed && row.stay.check_in >= today
            });
            rows.sort_by_key(|row| row.stay.check_in);
        }
        Ok(rows)
    }

    pub fn reservations_for_property(
        &self,
        property: &PropertyId,
        status: Option<ReservationStatus>,
    ) -> Result<Vec<Reservation>, BookingError> {
        self.catalog
            .property(property)?
            .ok_or(BookingError::PropertyNotFound)?;
        Ok(self.ledger.for_property(property, status)?)
    }

    /// Range given: availability verdict plus the conflicting stays.
    /// Range omitted: the property's blocked days for calendar rendering.
    pub fn availability_report(
        &self,
        property: &PropertyId,
        range: Option<StayRange>,
    ) -> Result<AvailabilityReport, BookingError> {
        self.catalog
            .property(property)?
            .ok_or(BookingError::PropertyNotFound)?;
        match range {
            Some(requested) => {
                let conflicts = self.availability.conflicts(property, &requested)?;
                Ok(AvailabilityReport::Range {
                    is_available: conflicts.is_empty(),
                    conflicts,
                })
            }
            None => Ok(AvailabilityReport::Calendar {
                blocked_dates: self.availability.blocked_dates(property)?,
            }),
        }
    }
}
