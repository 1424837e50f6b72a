pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;

// Shared state для всего приложения
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub gateway: gateway::Gateway,
    pub store: Arc<store::AppStore>,
    pub feed: Arc<realtime::ChangeFeed>,
    pub cache: cache::CacheService,
    pub auth: services::auth::AuthService,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database.url, config.database.pool_size).await?;
        db.migrate().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        tracing::info!("Redis connected");

        let gateway = gateway::Gateway::new(db.pool.clone());
        let store = Arc::new(store::AppStore::new());
        let feed = Arc::new(realtime::ChangeFeed::new(
            redis.clone(),
            config.redis.change_channel.clone(),
            gateway.clone(),
            store.clone(),
        ));
        let cache = cache::CacheService::new(redis.clone());
        let auth = services::auth::AuthService::new(&config.auth);

        Ok(Arc::new(Self {
            db,
            redis,
            gateway,
            store,
            feed,
            cache,
            auth,
            config,
        }))
    }
}
