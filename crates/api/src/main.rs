use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stolink_api::config::ServerConfig;
use stolink_api::router::build_app_router;
use stolink_api::state::AppState;
use stolink_worker::{ConsumerConfig, ImageConsumer, Services};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stolink_api=debug,stolink_worker=debug,stolink_pipeline=debug,tower_http=debug"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Providers ---
    let services = Services::from_env()
        .await
        .expect("Failed to initialise providers");
    tracing::info!("Providers initialised");

    // --- Queue consumer ---
    // Runs in the background; an unreachable broker only degrades /ready.
    let consumer = Arc::new(ImageConsumer::new(ConsumerConfig::from_env()));
    let consumer_cancel = CancellationToken::new();
    let consumer_handle = {
        let consumer = Arc::clone(&consumer);
        let handler = services.job_handler();
        let cancel = consumer_cancel.clone();
        tokio::spawn(async move { consumer.run(handler, cancel).await })
    };
    tracing::info!(queue = consumer.queue(), "Image consumer started");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        workflow: services.workflow(),
        consumer: Arc::clone(&consumer),
        files: services.object_store.clone(),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, stopping consumer");

    // The consumer finishes its in-flight job before it returns.
    consumer_cancel.cancel();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(shutdown_timeout, consumer_handle)
        .await
        .is_err()
    {
        tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Consumer did not stop in time",
        );
    }
    consumer.disconnect().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, starting graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, starting graceful shutdown"),
    }
}
