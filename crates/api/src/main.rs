use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use weave_api::config::ServerConfig;
use weave_api::engine::GenerationRunner;
use weave_api::router::build_app_router;
use weave_api::state::AppState;
use weave_api::background;
use weave_provider::HttpProvider;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weave_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "loaded server configuration");

    // --- Database ---
    let pool = weave_db::create_pool(&config.database_url)
        .await
        .expect("failed to open database");
    tracing::info!("database pool created");

    weave_db::run_migrations(&pool)
        .await
        .expect("failed to run database migrations");
    tracing::info!("database migrations applied");

    weave_db::health_check(&pool)
        .await
        .expect("database health check failed");

    // --- Event bus ---
    let event_bus = Arc::new(weave_events::EventBus::default());

    // --- Model provider ---
    if config.provider_api_key.is_none() {
        tracing::warn!("PROVIDER_API_KEY not set; provider calls will likely be rejected");
    }
    let provider = Arc::new(HttpProvider::new(
        config.provider_base_url.clone(),
        config.provider_api_key.clone(),
    ));

    // --- App state ---
    let state = AppState {
        pool: pool.clone(),
        config: Arc::new(config.clone()),
        provider: provider.clone(),
        event_bus: Arc::clone(&event_bus),
    };

    // --- Background tasks ---
    let cancel = CancellationToken::new();

    let runner = GenerationRunner::new(pool.clone(), provider, Arc::clone(&event_bus));
    let runner_cancel = cancel.clone();
    let runner_handle = tokio::spawn(async move {
        runner.run(runner_cancel).await;
    });

    let sweep_handle = tokio::spawn(background::generation_timeout::run(
        pool.clone(),
        Arc::clone(&event_bus),
        cancel.clone(),
    ));

    // --- Router / server ---
    let app = build_app_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid bind address");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    tracing::info!(%addr, "weave api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .expect("server error");

    // Give the background tasks a moment to observe the cancellation.
    let _ = tokio::join!(runner_handle, sweep_handle);
    tracing::info!("shutdown complete");
}

/// Resolve when Ctrl-C (or SIGTERM) arrives, triggering `cancel` so the
/// background tasks drain alongside the HTTP server.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
    cancel.cancel();
}
