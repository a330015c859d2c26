//! Storage adapters for the two score projections.
//!
//! - `RankingStore`: fast ordered leaderboard (Redis sorted set)
//! - `RecordStore`: durable per-video records, source of truth for owner views (PostgreSQL)
//!
//! Both are shared by every request worker through `Arc<dyn _>` handles created once at startup.

pub mod memory;
pub mod pg_records;
pub mod pool;
pub mod redis_ranking;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Video;

pub use memory::{MemoryRankingStore, MemoryRecordStore};
pub use pg_records::PgRecordStore;
pub use redis_ranking::RedisRankingStore;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// The store could not be reached; the command was not applied.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store failed while handling the command; its effect is unknown.
    #[error("store error: {0}")]
    Backend(String),

    #[error("video {video_id} is owned by {recorded_owner}")]
    OwnershipConflict {
        video_id: String,
        recorded_owner: String,
    },
}

impl StoreError {
    /// Only connection-level failures are known not to have been applied.
    pub fn is_retriable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ordered leaderboard keyed by video id
#[async_trait]
pub trait RankingStore: Send + Sync {
    /// Atomically add `delta` to the video's score, creating it when absent.
    async fn increment(&self, video_id: &str, delta: f64) -> StoreResult<f64>;

    /// Up to `limit` video ids, highest score first.
    async fn top(&self, limit: usize) -> StoreResult<Vec<String>>;

    async fn score(&self, video_id: &str) -> StoreResult<Option<f64>>;

    /// Overwrite scores for the given videos (reconciliation only).
    async fn set_scores(&self, entries: &[(String, f64)]) -> StoreResult<()>;
}

/// Durable one-row-per-video store
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the record with `score = delta` or add `delta` to the existing score.
    ///
    /// The recorded owner is never changed. With `enforce_owner` set, a request naming a
    /// different owner fails with `OwnershipConflict` and nothing is written.
    async fn upsert_increment(
        &self,
        video_id: &str,
        owner_id: &str,
        delta: f64,
        enforce_owner: bool,
    ) -> StoreResult<Video>;

    /// Up to `limit` videos owned by `owner_id`, highest score first.
    async fn top_by_owner(&self, owner_id: &str, limit: usize) -> StoreResult<Vec<Video>>;

    async fn owner_of(&self, video_id: &str) -> StoreResult<Option<String>>;

    /// Keyset page of records ordered by `video_id`, starting after `after`.
    async fn scan(&self, after: Option<&str>, limit: usize) -> StoreResult<Vec<Video>>;
}
