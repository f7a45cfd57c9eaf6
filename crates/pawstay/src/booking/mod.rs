//! Reservation conflict resolution and booking lifecycle.
//!
//! The write path is a single funnel: `routes` -> `service` -> `ledger`,
//! with the conflict check living inside the ledger's atomic commit. Reads
//! flow the other way through the `availability` index. The catalog and
//! directory are read-only collaborators behind trait seams.

pub mod availability;
pub mod confirmation;
pub mod directory;
pub mod domain;
pub mod ledger;
pub mod routes;
pub mod service;

pub use availability::AvailabilityIndex;
pub use confirmation::{ConfirmationCodeGenerator, TimestampCodeGenerator};
pub use directory::{AccountDirectory, PropertyCatalog};
pub use ledger::{InMemoryReservationLedger, ReservationLedger};
pub use routes::booking_router;
pub use service::{
    BookingError, BookingLifecycleService, Clock, FixedClock, ReservationRequest, SystemClock,
};
