use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use pawstay::booking::{
    booking_router, BookingLifecycleService, InMemoryReservationLedger, SystemClock,
    TimestampCodeGenerator,
};
use pawstay::config::AppConfig;
use pawstay::error::AppError;
use pawstay::telemetry;
use tracing::info;

use crate::cli::ServeArgs;
use crate::infra::{seed_fixtures, AppState, InMemoryAccountDirectory, InMemoryPropertyCatalog};
use crate::routes::with_operational_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = Arc::new(InMemoryPropertyCatalog::default());
    let directory = Arc::new(InMemoryAccountDirectory::default());
    seed_fixtures(&catalog, &directory);

    let service = Arc::new(BookingLifecycleService::new(
        Arc::new(InMemoryReservationLedger::new()),
        catalog,
        directory,
        Arc::new(TimestampCodeGenerator),
        Arc::new(SystemClock),
    ));

    let app = with_operational_routes(booking_router(service))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "booking engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
