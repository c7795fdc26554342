use prometheus::Registry;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::TokenManager;
use crate::config::AppConfig;
use crate::db::{ExampleStore, PgStore, UserStore};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub examples: Arc<dyn ExampleStore>,
    pub tokens: TokenManager,
    pub config: Arc<AppConfig>,
    pub registry: Registry,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        examples: Arc<dyn ExampleStore>,
        config: AppConfig,
        registry: Registry,
    ) -> Self {
        Self {
            users,
            examples,
            tokens: TokenManager::new(&config.jwt_secret),
            config: Arc::new(config),
            registry,
            started_at: Instant::now(),
        }
    }

    /// Both stores backed by one PostgreSQL pool.
    pub fn with_pg(store: PgStore, config: AppConfig, registry: Registry) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store, config, registry)
    }
}
