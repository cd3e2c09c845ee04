//! GeoGuard HTTP server.
//!
//! Run with: cargo run --bin geoguard-server
//! API: http://localhost:8080/v1/...
//! Metrics: http://localhost:9090/metrics

mod config;

use axum::{routing::get, Router};
use config::{Config, StorageBackend};
use geoguard_core::environment::{Clock, SystemClock};
use geoguard_engine::mocks::InMemoryEnvironment;
use geoguard_engine::{Environment, MaintenanceScheduler, RedisEnvironment};
use geoguard_runtime::metrics::MetricsServer;
use geoguard_web::{router, AppState};
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();

    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        backend = ?config.storage.backend,
        call_timeout = ?config.call_timeout,
        "Starting GeoGuard server"
    );

    start_metrics(&config).await?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match config.storage.backend {
        StorageBackend::Memory => {
            warn!("Using in-memory stores; state is lost on restart");
            let env = InMemoryEnvironment::in_memory(config.engine(), clock);
            serve(Arc::new(env), &config).await
        }
        StorageBackend::Redis => {
            let env = RedisEnvironment::redis(
                &config.storage.redis_url,
                &config.storage.namespace,
                config.engine(),
                clock,
            )
            .await?;
            serve(Arc::new(env), &config).await
        }
    }
}

/// Install the Prometheus recorder and serve `/metrics` on its own listener.
async fn start_metrics(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut metrics = MetricsServer::new(config.metrics_addr().parse()?);
    metrics.start()?;

    let Some(handle) = metrics.handle().cloned() else {
        warn!("Metrics recorder owned elsewhere; scrape endpoint disabled");
        return Ok(());
    };

    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let listener = tokio::net::TcpListener::bind(metrics.addr()).await?;
    info!(address = %metrics.addr(), "Metrics endpoint listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "Metrics server stopped");
        }
    });

    Ok(())
}

/// Run the API and the maintenance task until a shutdown signal arrives.
async fn serve<E: Environment>(env: Arc<E>, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let maintenance = MaintenanceScheduler::new(Arc::clone(&env), config.maintenance).spawn(shutdown_rx);

    let app = router(AppState::new(env));

    let addr = config.http_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(());
    if let Err(e) = maintenance.await {
        error!(error = %e, "Maintenance task ended abnormally");
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}
