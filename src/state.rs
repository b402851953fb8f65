use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{Connector, MemoryStore, PgConnector};

#[derive(Clone)]
pub struct AppState {
    pub connector: Arc<dyn Connector>,
    /// Fixed configuration. `None` means every request re-reads the environment.
    pub config: Option<Arc<AppConfig>>,
}

impl AppState {
    pub fn init() -> Self {
        Self {
            connector: Arc::new(PgConnector),
            config: None,
        }
    }

    pub fn from_parts(connector: Arc<dyn Connector>, config: Option<Arc<AppConfig>>) -> Self {
        Self { connector, config }
    }

    /// State backed by an in-memory store and default configuration.
    pub fn fake(store: MemoryStore) -> Self {
        Self {
            connector: Arc::new(store),
            config: Some(Arc::new(AppConfig::default())),
        }
    }

    pub fn config(&self) -> anyhow::Result<AppConfig> {
        match &self.config {
            Some(cfg) => Ok(cfg.as_ref().clone()),
            None => AppConfig::from_env(),
        }
    }
}
