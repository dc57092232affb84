use crate::shared::config::AppConfig;
use crate::shared::utils::DbPool;

/// Process-wide shared resources, created once at startup and cloned into
/// every worker.
#[derive(Clone)]
pub struct AppState {
    pub conn: DbPool,
    pub config: AppConfig,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(conn: DbPool, config: AppConfig) -> Self {
        Self {
            conn,
            config,
            http: reqwest::Client::new(),
        }
    }
}
