//! Scripted end-to-end booking scenario for stakeholder demos.

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use pawstay::booking::domain::{AccountId, PropertyId, Reservation, ReservationStatus};
use pawstay::booking::{
    BookingError, BookingLifecycleService, InMemoryReservationLedger, ReservationRequest,
    SystemClock, TimestampCodeGenerator,
};
use pawstay::error::AppError;

use crate::infra::{seed_fixtures, InMemoryAccountDirectory, InMemoryPropertyCatalog};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Check-in date for the scripted stay (YYYY-MM-DD). Defaults to 30 days out.
    #[arg(long)]
    pub(crate) check_in: Option<NaiveDate>,
    /// Nights for the scripted stay
    #[arg(long, default_value_t = 3)]
    pub(crate) nights: u32,
}

type DemoService = BookingLifecycleService<
    InMemoryReservationLedger,
    InMemoryPropertyCatalog,
    InMemoryAccountDirectory,
    TimestampCodeGenerator,
>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let check_in = args
        .check_in
        .unwrap_or_else(|| Local::now().date_naive() + Duration::days(30));
    let check_out = check_in + Duration::days(i64::from(args.nights.max(1)));

    let catalog = Arc::new(InMemoryPropertyCatalog::default());
    let directory = Arc::new(InMemoryAccountDirectory::default());
    seed_fixtures(&catalog, &directory);

    let service: Arc<DemoService> = Arc::new(BookingLifecycleService::new(
        Arc::new(InMemoryReservationLedger::new()),
        catalog,
        directory,
        Arc::new(TimestampCodeGenerator),
        Arc::new(SystemClock),
    ));

    let guest = AccountId("guest-ada".to_string());
    let property = PropertyId("den-riverside".to_string());

    println!("== Pawstay booking demo ==");
    println!("property {property}, stay [{check_in}, {check_out})\n");

    let request = |ci: NaiveDate, co: NaiveDate| ReservationRequest {
        guest_id: guest.clone(),
        property_id: property.clone(),
        check_in: ci,
        check_out: co,
        adults: 2,
        children: 1,
        infants: 0,
        pets: 1,
    };

    println!("-- 1. guest books the stay");
    let first = report(service.create_reservation(request(check_in, check_out)));

    println!("-- 2. a second request overlaps by one night and is turned away");
    report(service.create_reservation(request(
        check_out - Duration::days(1),
        check_out + Duration::days(2),
    )));

    println!("-- 3. a back-to-back stay starting on the checkout day succeeds");
    report(service.create_reservation(request(check_out, check_out + Duration::days(2))));

    println!("-- 4. blocked days on the calendar");
    match service.availability().blocked_dates(&property) {
        Ok(days) => println!(
            "   {}\n",
            days.iter()
                .map(|day| day.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
        Err(err) => println!("   error: {err}\n"),
    }

    if let Some(reservation) = first {
        println!("-- 5. lookup by confirmation code");
        report(service.reservation_by_confirmation(&reservation.confirmation_code));

        println!("-- 6. guest cancels, freeing the range");
        report(service.transition_status(
            &guest,
            reservation.id,
            ReservationStatus::Cancelled,
        ));

        println!("-- 7. the original range books again");
        report(service.create_reservation(request(check_in, check_out)));
    }

    Ok(())
}

fn report(outcome: Result<Reservation, BookingError>) -> Option<Reservation> {
    match outcome {
        Ok(reservation) => {
            println!(
                "   ok: #{} {} {} nights, {} cents, status {}\n",
                reservation.id,
                reservation.confirmation_code,
                reservation.stay.nights(),
                reservation.total_price_cents,
                reservation.status
            );
            Some(reservation)
        }
        Err(err) => {
            println!("   rejected: {err}\n");
            None
        }
    }
}
