//! Core booking types shared by the ledger, availability index, and lifecycle
//! service.
//!
//! The central invariant lives here in miniature: a stay occupies the
//! half-open interval `[check_in, check_out)`, and `StayRange::overlaps` is
//! the one canonical overlap test. Every other module delegates to it so that
//! boundary dates cannot diverge between code paths.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier for a listed property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub String);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a guest or host account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Internal, sequential reservation identity assigned by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReservationId(pub u64);

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Guest-facing lookup token, distinct from the internal reservation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfirmationCode(pub String);

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Half-open stay interval `[check_in, check_out)`.
///
/// The checkout day is not occupied: a stay checking out on day X and another
/// checking in on day X share the property without conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, InvalidStayRange> {
        if check_out <= check_in {
            return Err(InvalidStayRange {
                check_in,
                check_out,
            });
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// The canonical half-open overlap test: `a < d && c < b`.
    pub fn overlaps(&self, other: &StayRange) -> bool {
        self.check_in < other.check_out && other.check_in < self.check_out
    }

    pub fn nights(&self) -> u32 {
        (self.check_out - self.check_in).num_days() as u32
    }

    /// Calendar days occupied by the stay, checkout day excluded.
    pub fn occupied_days(&self) -> impl Iterator<Item = NaiveDate> {
        let check_out = self.check_out;
        self.check_in
            .iter_days()
            .take_while(move |day| *day < check_out)
    }
}

impl fmt::Display for StayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.check_in, self.check_out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("check-out {check_out} must be after check-in {check_in}")]
pub struct InvalidStayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

/// Party sizes declared at booking time. Pets are counted separately from the
/// occupancy figure and against the property's own pet capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestCounts {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
    #[serde(default)]
    pub infants: u32,
    #[serde(default)]
    pub pets: u32,
}

impl GuestCounts {
    pub fn total_guests(&self) -> u32 {
        self.adults + self.children + self.infants
    }
}

/// Stored lifecycle status. Only this field gates state-machine transitions;
/// see [`DisplayStatus`] for the derived, informational view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Confirmed,
    Pending,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Active reservations count toward the non-overlap invariant.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Confirmed | Self::Pending)
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Informational status derived from the stored status and the calendar.
/// Never consulted when deciding whether a transition is legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Cancelled,
    Upcoming,
    Current,
    Completed,
}

impl DisplayStatus {
    pub fn derive(status: ReservationStatus, stay: StayRange, today: NaiveDate) -> Self {
        if status == ReservationStatus::Cancelled {
            return Self::Cancelled;
        }
        if today < stay.check_in {
            Self::Upcoming
        } else if today <= stay.check_out {
            Self::Current
        } else {
            Self::Completed
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Cancelled => "cancelled",
            Self::Upcoming => "upcoming",
            Self::Current => "current",
            Self::Completed => "completed",
        }
    }
}

/// Authoritative booking row owned by the ledger.
///
/// Rows are never deleted. Cancellation and completion are terminal statuses
/// so history and confirmation-code lookups survive the stay. Prices are
/// fixed at creation and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub confirmation_code: ConfirmationCode,
    pub property_id: PropertyId,
    pub guest_id: AccountId,
    #[serde(flatten)]
    pub stay: StayRange,
    pub guests: GuestCounts,
    pub price_per_night_cents: u32,
    pub total_price_cents: u64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn display_status(&self, today: NaiveDate) -> DisplayStatus {
        DisplayStatus::derive(self.status, self.stay, today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn range(check_in: NaiveDate, check_out: NaiveDate) -> StayRange {
        StayRange::new(check_in, check_out).expect("valid range")
    }

    #[test]
    fn rejects_inverted_and_empty_ranges() {
        let day = date(2025, 9, 1);
        assert!(StayRange::new(day, day).is_err());
        assert!(StayRange::new(date(2025, 9, 5), day).is_err());
    }

    #[test]
    fn overlap_is_symmetric_and_half_open() {
        let first = range(date(2025, 9, 1), date(2025, 9, 5));
        let inside = range(date(2025, 9, 2), date(2025, 9, 4));
        let straddling = range(date(2025, 9, 4), date(2025, 9, 8));
        let containing = range(date(2025, 8, 30), date(2025, 9, 10));

        assert!(first.overlaps(&inside));
        assert!(inside.overlaps(&first));
        assert!(first.overlaps(&straddling));
        assert!(first.overlaps(&containing));
    }

    #[test]
    fn checkout_day_is_free_for_the_next_check_in() {
        let first = range(date(2025, 9, 1), date(2025, 9, 5));
        let adjacent = range(date(2025, 9, 5), date(2025, 9, 8));
        assert!(!first.overlaps(&adjacent));
        assert!(!adjacent.overlaps(&first));
    }

    #[test]
    fn occupied_days_exclude_checkout() {
        let stay = range(date(2025, 9, 1), date(2025, 9, 4));
        let days: Vec<NaiveDate> = stay.occupied_days().collect();
        assert_eq!(
            days,
            vec![date(2025, 9, 1), date(2025, 9, 2), date(2025, 9, 3)]
        );
        assert_eq!(stay.nights(), 3);
    }

    #[test]
    fn display_status_tracks_the_calendar() {
        let stay = range(date(2025, 9, 10), date(2025, 9, 14));
        let derive = |status, today| DisplayStatus::derive(status, stay, today);

        assert_eq!(
            derive(ReservationStatus::Confirmed, date(2025, 9, 1)),
            DisplayStatus::Upcoming
        );
        assert_eq!(
            derive(ReservationStatus::Confirmed, date(2025, 9, 12)),
            DisplayStatus::Current
        );
        // The derived view reports "current" through the checkout day itself.
        assert_eq!(
            derive(ReservationStatus::Confirmed, date(2025, 9, 14)),
            DisplayStatus::Current
        );
        assert_eq!(
            derive(ReservationStatus::Confirmed, date(2025, 9, 15)),
            DisplayStatus::Completed
        );
        assert_eq!(
            derive(ReservationStatus::Cancelled, date(2025, 9, 12)),
            DisplayStatus::Cancelled
        );
    }

    #[test]
    fn status_activity_matches_the_invariant() {
        assert!(ReservationStatus::Confirmed.is_active());
        assert!(ReservationStatus::Pending.is_active());
        assert!(!ReservationStatus::Cancelled.is_active());
        assert!(!ReservationStatus::Completed.is_active());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::Completed.is_terminal());
    }
}
