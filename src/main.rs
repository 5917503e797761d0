use std::net::SocketAddr;
use std::process::ExitCode;

use tokio::net::TcpListener;
use tracing::{error, info};

use product_reviews::metrics::try_init_metrics;
use product_reviews::{AppState, Config, Stores, build_router, utils};

#[tokio::main]
async fn main() -> ExitCode {
    // Configuration comes first: it decides the log format
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            utils::init_tracing(Default::default());
            error!("Configuration error: {e}");
            return ExitCode::from(exitcode::CONFIG as u8);
        }
    };
    utils::init_tracing(config.log_format);

    info!(
        "Starting product reviews API v{}",
        env!("CARGO_PKG_VERSION")
    );

    match run(config).await {
        Ok(()) => ExitCode::from(exitcode::OK as u8),
        Err(exit_code) => ExitCode::from(exit_code as u8),
    }
}

/// Run the application, returning an exit code on error.
async fn run(config: Config) -> Result<(), exitcode::ExitCode> {
    info!(
        host = %config.host,
        port = %config.port,
        environment = %config.environment,
        memory_store = config.uses_memory_store(),
        limiter_enabled = config.limiter_enabled,
        "Configuration loaded"
    );

    if let Some(metrics_addr) = config.metrics_addr() {
        try_init_metrics(metrics_addr);
    }

    let stores = Stores::open(
        &config.database_url,
        config.db_max_connections,
        config.db_query_timeout,
    )
    .await
    .map_err(|e| {
        error!("Failed to open data store: {e}");
        exitcode::UNAVAILABLE
    })?;

    let addr: SocketAddr = config.server_addr().parse().map_err(|e| {
        error!("Invalid server address: {e}");
        exitcode::CONFIG
    })?;

    let state = AppState::new(config, stores).map_err(|e| {
        error!("Failed to build application state: {e}");
        exitcode::CONFIG
    })?;
    let app = build_router(state.clone());

    let listener = TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind to {addr}: {e}");
        exitcode::UNAVAILABLE
    })?;

    info!("Server listening on http://{addr}");
    info!("API endpoints:");
    info!("  GET    /v1/healthcheck        - Health check");
    info!("  POST   /v1/product            - Create product");
    info!("  GET    /v1/products           - List products");
    info!("  GET    /v1/products/{{id}}      - Show product");
    info!("  PATCH  /v1/products/{{id}}      - Update product");
    info!("  DELETE /v1/products/{{id}}      - Delete product");
    info!("  POST   /v1/review             - Create review");
    info!("  GET    /v1/reviews            - List reviews");
    info!("  GET    /v1/review/{{id}}        - Show review");

    // Peer addresses feed the per-client rate limiter
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(utils::shutdown_signal())
    .await
    .map_err(|e| {
        error!("Server error: {e}");
        exitcode::SOFTWARE
    })?;

    info!("HTTP server stopped, shutting down background tasks...");
    state.shutdown().await;

    info!("Server shutdown complete");
    Ok(())
}
