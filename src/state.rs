use std::sync::Arc;

use crate::config::{AppConfig, JwtConfig};
use crate::store::{MemStore, PgStore, Store};

/// Shared per-process state. The store sits behind a trait object so
/// handlers never depend on a concrete backend.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let store = Arc::new(PgStore::connect(&config.database_url).await?) as Arc<dyn Store>;
        Ok(Self { store, config })
    }

    pub fn from_parts(store: Arc<dyn Store>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    /// State backed by the in-memory store, for tests.
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            database_url: "postgres://unused".into(),
            jwt: JwtConfig {
                secret: "test-secret".into(),
                ttl_minutes: 60,
            },
        });
        Self {
            store: Arc::new(MemStore::new()),
            config,
        }
    }
}
