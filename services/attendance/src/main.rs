use std::time::Duration;

use sea_orm::Database;
use tracing::info;

use rollcall_attendance::config::AttendanceConfig;
use rollcall_attendance::infra::mailer::EmailTransport;
use rollcall_attendance::infra::outbox::{OutboxNotifier, await_drain, run_outbox};
use rollcall_attendance::infra::sweeper::spawn_sweeper;
use rollcall_attendance::router::build_router;
use rollcall_attendance::state::AppState;
use rollcall_auth_types::identity::TokenSecret;
use rollcall_core::clock::SystemClock;

/// How long shutdown waits for queued OTP deliveries.
const OUTBOX_DRAIN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    rollcall_core::tracing::init_tracing();

    let config = AttendanceConfig::from_env().expect("invalid configuration");

    let (notifier, outbox_rx) = OutboxNotifier::channel(config.outbox_capacity);
    let jwt_secret = TokenSecret::new(config.jwt_secret.clone());

    let state = match &config.database_url {
        Some(url) => {
            let db = Database::connect(url)
                .await
                .expect("failed to connect to database");
            info!("session codes and attendance stored in postgres");
            AppState::with_database(
                db,
                notifier,
                SystemClock::shared(),
                config.tunables,
                jwt_secret,
                config.cookie_domain.clone(),
            )
        }
        None => {
            info!("DATABASE_URL not set, using in-memory stores");
            AppState::in_memory(
                notifier,
                SystemClock::shared(),
                config.tunables,
                jwt_secret,
                config.cookie_domain.clone(),
            )
        }
    };

    // OTP delivery
    let transport = EmailTransport::from_config(
        config.email_api_url.clone(),
        config.email_api_key.clone(),
    );
    let outbox = tokio::spawn(run_outbox(outbox_rx, transport));

    // Expiry sweep
    let sweeper = spawn_sweeper(state.sweep_usecase(), config.tunables.sweep_interval);

    // HTTP server
    let router = build_router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    info!("attendance service listening on {addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await
        .expect("server error");

    // The router, and with it the last notifier, is gone once serve returns.
    sweeper.shutdown().await;
    await_drain(outbox, OUTBOX_DRAIN_GRACE).await;
}
