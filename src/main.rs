use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tour_booking::{
    config::{Config, LogFormat},
    controllers, AppState,
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::new(&config.app.rust_log);
    let registry = tracing_subscriber::registry().with(filter);
    match config.app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let db_ok = state.db.ping().await;
    let mut conn = state.redis.conn.clone();
    let redis_ok = redis::cmd("PING").query_async::<String>(&mut conn).await.is_ok();
    let (loaded, version) = {
        let snapshot = state.store.snapshot().await;
        (snapshot.loaded, snapshot.version)
    };
    let status = if db_ok && redis_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(json!({ "database": db_ok, "redis": redis_ok, "loaded": loaded, "version": version })),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(&config);

    info!("Starting tour booking service ({})", config.app.environment);

    let app_state = AppState::new(config.clone()).await?;

    // --- Initial load and background tasks ---

    match app_state.feed.resync().await {
        Ok(outcome) => info!("Initial load finished: {:?}", outcome),
        // слушатель и периодическая синхронизация догрузят данные позже
        Err(e) => error!("Initial load failed: {:?}", e),
    }

    tokio::spawn(app_state.feed.clone().run_listener());

    if config.sync.resync_interval_secs > 0 {
        let every = Duration::from_secs(config.sync.resync_interval_secs);
        tokio::spawn(app_state.feed.clone().run_periodic_resync(every));
    }

    // --- Start the web server ---

    let app = Router::new()
        .route("/", get(|| async { "Tour Booking API v1.0" }))
        .route("/health", get(health))
        .nest("/api", controllers::routes())
        .with_state(app_state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
