use std::sync::Arc;
use std::time::Duration;

use crate::db::{RankingStore, RecordStore};
use crate::services::{EngineConfig, RankingEngine};

/// Shared by every request worker; store handles are created once at startup
#[derive(Clone)]
pub struct AppState {
    pub engine: RankingEngine,
    pub ranking: Arc<dyn RankingStore>,
    pub records: Arc<dyn RecordStore>,
    /// Deadline for each store call
    pub store_timeout: Duration,
    pub max_top_limit: usize,
}

impl AppState {
    pub fn new(
        ranking: Arc<dyn RankingStore>,
        records: Arc<dyn RecordStore>,
        engine_config: EngineConfig,
        store_timeout: Duration,
        max_top_limit: usize,
    ) -> Self {
        let engine = RankingEngine::new(ranking.clone(), records.clone(), engine_config);
        Self {
            engine,
            ranking,
            records,
            store_timeout,
            max_top_limit,
        }
    }
}
