pub mod error;
pub mod polls;
pub mod status_policy;

use chrono::Duration;
use murmur_db::DbPool;
use murmur_federation::RemotePollFetcher;
use std::sync::Arc;

/// Remote polls fetched more recently than this are served from the database.
pub const DEFAULT_POLL_STALE_AFTER_SECONDS: i64 = 60;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: AppConfig,
    /// Collaborator used to refresh stale remote polls. `None` when federation is disabled.
    pub poll_fetcher: Option<Arc<dyn RemotePollFetcher>>,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub poll_stale_after: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_stale_after: Duration::seconds(DEFAULT_POLL_STALE_AFTER_SECONDS),
        }
    }
}
