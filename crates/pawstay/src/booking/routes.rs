//! HTTP surface for the booking engine.
//!
//! The router stays generic over the service's collaborators so the api
//! service and tests can plug in their own ledger, catalog, and directory.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::confirmation::ConfirmationCodeGenerator;
use super::directory::{AccountDirectory, PropertyCatalog};
use super::domain::{
    AccountId, ConfirmationCode, PropertyId, Reservation, ReservationId, ReservationStatus,
    StayRange,
};
use super::ledger::ReservationLedger;
use super::service::{
    AvailabilityReport, BookingError, BookingLifecycleService, ReservationRequest,
    ValidationError,
};

type Service<L, P, D, G> = Arc<BookingLifecycleService<L, P, D, G>>;

/// Router exposing the booking endpoints under `/api/v1/bookings`.
pub fn booking_router<L, P, D, G>(service: Service<L, P, D, G>) -> Router
where
    L: ReservationLedger + 'static,
    P: PropertyCatalog + 'static,
    D: AccountDirectory + 'static,
    G: ConfirmationCodeGenerator + 'static,
{
    Router::new()
        .route("/api/v1/bookings", post(create_handler::<L, P, D, G>))
        .route(
            "/api/v1/bookings/availability/:property_id",
            get(availability_handler::<L, P, D, G>),
        )
        .route(
            "/api/v1/bookings/confirmation/:code",
            get(confirmation_handler::<L, P, D, G>),
        )
        .route(
            "/api/v1/bookings/guest/:guest_id",
            get(guest_bookings_handler::<L, P, D, G>),
        )
        .route(
            "/api/v1/bookings/property/:property_id",
            get(property_bookings_handler::<L, P, D, G>),
        )
        .route(
            "/api/v1/bookings/:reservation_id/status",
            patch(status_change_handler::<L, P, D, G>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct AvailabilityQuery {
    check_in: Option<NaiveDate>,
    check_out: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct BookingsQuery {
    status: Option<ReservationStatus>,
    #[serde(default)]
    upcoming: bool,
}

#[derive(Debug, Deserialize)]
struct StatusChangeRequest {
    account_id: AccountId,
    status: ReservationStatus,
}

/// Reservation payload enriched with the derived display status and the
/// occupancy total, the shape guest-facing screens consume.
fn reservation_payload(reservation: &Reservation, today: NaiveDate) -> serde_json::Value {
    json!({
        "reservation_id": reservation.id.0,
        "confirmation_code": reservation.confirmation_code.0,
        "property_id": reservation.property_id.0,
        "guest_id": reservation.guest_id.0,
        "check_in": reservation.stay.check_in,
        "check_out": reservation.stay.check_out,
        "total_nights": reservation.stay.nights(),
        "adults": reservation.guests.adults,
        "children": reservation.guests.children,
        "infants": reservation.guests.infants,
        "pets": reservation.guests.pets,
        "total_guests": reservation.guests.total_guests(),
        "price_per_night_cents": reservation.price_per_night_cents,
        "total_price_cents": reservation.total_price_cents,
        "status": reservation.status.label(),
        "display_status": reservation.display_status(today).label(),
        "created_at": reservation.created_at,
    })
}

fn error_response(error: BookingError) -> Response {
    let status = match &error {
        BookingError::Validation(_) => StatusCode::BAD_REQUEST,
        BookingError::GuestNotFound
        | BookingError::PropertyNotFound
        | BookingError::ReservationNotFound => StatusCode::NOT_FOUND,
        BookingError::Ineligible(_) => StatusCode::FORBIDDEN,
        BookingError::DateConflict { .. } | BookingError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        BookingError::ConfirmationExhausted | BookingError::Storage(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        BookingError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let body = match &error {
        BookingError::DateConflict { conflicts, .. } => json!({
            "error": error.to_string(),
            "conflicts": conflicts,
        }),
        _ => json!({ "error": error.to_string() }),
    };
    (status, axum::Json(body)).into_response()
}

async fn create_handler<L, P, D, G>(
    State(service): State<Service<L, P, D, G>>,
    axum::Json(request): axum::Json<ReservationRequest>,
) -> Response
where
    L: ReservationLedger + 'static,
    P: PropertyCatalog + 'static,
    D: AccountDirectory + 'static,
    G: ConfirmationCodeGenerator + 'static,
{
    match service.create_reservation(request) {
        Ok(reservation) => {
            let payload = reservation_payload(&reservation, service.today());
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn availability_handler<L, P, D, G>(
    State(service): State<Service<L, P, D, G>>,
    Path(property_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Response
where
    L: ReservationLedger + 'static,
    P: PropertyCatalog + 'static,
    D: AccountDirectory + 'static,
    G: ConfirmationCodeGenerator + 'static,
{
    let range = match (query.check_in, query.check_out) {
        (Some(check_in), Some(check_out)) => match StayRange::new(check_in, check_out) {
            Ok(range) => Some(range),
            Err(_) => {
                return error_response(ValidationError::CheckOutNotAfterCheckIn.into());
            }
        },
        (None, None) => None,
        _ => {
            let body = json!({ "error": "check_in and check_out must be supplied together" });
            return (StatusCode::BAD_REQUEST, axum::Json(body)).into_response();
        }
    };

    match service.availability_report(&PropertyId(property_id), range) {
        Ok(AvailabilityReport::Range {
            is_available,
            conflicts,
        }) => {
            let payload = json!({ "is_available": is_available, "conflicts": conflicts });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(AvailabilityReport::Calendar { blocked_dates }) => {
            let payload = json!({ "blocked_dates": blocked_dates });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn confirmation_handler<L, P, D, G>(
    State(service): State<Service<L, P, D, G>>,
    Path(code): Path<String>,
) -> Response
where
    L: ReservationLedger + 'static,
    P: PropertyCatalog + 'static,
    D: AccountDirectory + 'static,
    G: ConfirmationCodeGenerator + 'static,
{
    match service.reservation_by_confirmation(&ConfirmationCode(code)) {
        Ok(reservation) => {
            let payload = reservation_payload(&reservation, service.today());
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}

async fn guest_bookings_handler<L, P, D, G>(
    State(service): State<Service<L, P, D, G>>,
    Path(guest_id): Path<String>,
    Query(query): Query<BookingsQuery>,
) -> Response
where
    L: ReservationLedger + 'static,
    P: PropertyCatalog + 'static,
    D: AccountDirectory + 'static,
    G: ConfirmationCodeGenerator + 'static,
{
    match service.reservations_for_guest(&AccountId(guest_id), query.status, query.upcoming) {
        Ok(rows) => bookings_payload(rows, service.today()),
        Err(error) => error_response(error),
    }
}

async fn property_bookings_handler<L, P, D, G>(
    State(service): State<Service<L, P, D, G>>,
    Path(property_id): Path<String>,
    Query(query): Query<BookingsQuery>,
) -> Response
where
    L: ReservationLedger + 'static,
    P: PropertyCatalog + 'static,
    D: AccountDirectory + 'static,
    G: ConfirmationCodeGenerator + 'static,
{
    match service.reservations_for_property(&PropertyId(property_id), query.status) {
        Ok(rows) => bookings_payload(rows, service.today()),
        Err(error) => error_response(error),
    }
}

fn bookings_payload(rows: Vec<Reservation>, today: NaiveDate) -> Response {
    let bookings: Vec<serde_json::Value> = rows
        .iter()
        .map(|reservation| reservation_payload(reservation, today))
        .collect();
    let payload = json!({ "total": bookings.len(), "bookings": bookings });
    (StatusCode::OK, axum::Json(payload)).into_response()
}

async fn status_change_handler<L, P, D, G>(
    State(service): State<Service<L, P, D, G>>,
    Path(reservation_id): Path<u64>,
    axum::Json(request): axum::Json<StatusChangeRequest>,
) -> Response
where
    L: ReservationLedger + 'static,
    P: PropertyCatalog + 'static,
    D: AccountDirectory + 'static,
    G: ConfirmationCodeGenerator + 'static,
{
    match service.transition_status(
        &request.account_id,
        ReservationId(reservation_id),
        request.status,
    ) {
        Ok(reservation) => {
            let payload = reservation_payload(&reservation, service.today());
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => error_response(error),
    }
}
