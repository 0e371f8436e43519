//! Onboarding worker: runs the reminder scheduler and the event log listener
//! over the store that [`WorkerState::service`] writes to.

use std::sync::Arc;

use tenantry_core::clock::SystemClock;
use tenantry_worker::listener::log_events;
use tenantry_worker::{LogFormat, WorkerConfig, WorkerState};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = WorkerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tenantry_worker=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    for rejected in &config.rejected {
        tracing::warn!(value = %rejected, "Ignoring unparseable setting, using default");
    }
    tracing::info!(
        scan_interval_secs = config.reminder_scan_interval_secs,
        event_bus_capacity = config.event_bus_capacity,
        "Loaded worker configuration"
    );

    // --- Wiring ---
    let state = WorkerState::new(config, Arc::new(SystemClock));
    let cancel = CancellationToken::new();

    let listener = tokio::spawn(log_events(state.event_bus.subscribe(), cancel.clone()));

    let scheduler = Arc::clone(&state.scheduler);
    let scheduler_cancel = cancel.clone();
    let scheduler = tokio::spawn(async move { scheduler.run(scheduler_cancel).await });

    tracing::info!("Onboarding worker running");
    shutdown_signal().await;

    cancel.cancel();
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Reminder scheduler task failed");
    }
    match listener.await {
        Ok(seen) => tracing::info!(events = seen, "Event listener stopped"),
        Err(e) => tracing::error!(error = %e, "Event listener task failed"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
