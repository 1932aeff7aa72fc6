use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use axum::{routing::get, Router};
use http::HeaderValue;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod middleware;
mod routes;
mod services;

use config::Config;
use services::{init, turn_order::TurnShuffler};

pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub shuffler: TurnShuffler,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "family_hub=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    tracing::info!("Starting Family Hub service");

    // Initialize database
    let pool = init::init_db(&config).await?;

    let app_state = Arc::new(AppState {
        db: pool,
        shuffler: init::init_turn_shuffler(&config),
    });

    let thread_shutdown = Arc::new(AtomicBool::new(false));

    // Rate limiter for the shuffle endpoint, keyed by client IP.
    let mut shuffle_builder = GovernorConfigBuilder::default().key_extractor(SmartIpKeyExtractor);
    shuffle_builder.per_second(config.rate_limit.shuffle_per_second.into());
    shuffle_builder.burst_size(config.rate_limit.shuffle_burst);
    shuffle_builder.error_handler(middleware::rate_limit::rate_limited_response);
    let shuffle_gov_conf = Arc::new(
        shuffle_builder
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Failed to build shuffle governor config"))?,
    );

    let shuffle_cleaner = {
        let limiter = shuffle_gov_conf.limiter().clone();
        middleware::rate_limit::spawn_cleanup("Shuffle", thread_shutdown.clone(), move || {
            limiter.retain_recent();
            limiter.len()
        })
    };

    let shuffle_rate_layer = GovernorLayer {
        config: shuffle_gov_conf.clone(),
    };

    let frontend_origin = config
        .server
        .frontend_url
        .parse::<HeaderValue>()
        .map_err(|_| anyhow::anyhow!("Invalid FRONTEND_URL for CORS"))?;

    // Build router
    let app = Router::new()
        // Health check
        .route("/health", get(routes::health::health_check))
        // White Elephant gift exchange
        .nest(
            "/api/gifts",
            routes::gifts::router().layer(shuffle_rate_layer),
        )
        .with_state(app_state.clone())
        .layer(axum::middleware::from_fn(middleware::csp::csp_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(frontend_origin)
                .allow_methods([http::Method::GET, http::Method::POST, http::Method::OPTIONS])
                .allow_headers([
                    http::header::CONTENT_TYPE,
                    http::header::AUTHORIZATION,
                    http::header::ACCEPT,
                ])
                .allow_credentials(true),
        );

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    // The governor's SmartIpKeyExtractor falls back to the peer address, so the
    // service needs connect info.
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped; waiting for rate limiter cleanup thread");
    thread_shutdown.store(true, Ordering::SeqCst);
    if let Err(e) = shuffle_cleaner.join() {
        tracing::warn!("Shuffle cleanup thread join failed: {:?}", e);
    }

    app_state.db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = term.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("Failed to bind SIGTERM handler: {}", e);
                ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await;
    }

    tracing::info!("Shutdown signal received");
}
