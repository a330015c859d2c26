use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError};
use tracing::{debug, info};

use super::{RankingStore, StoreError, StoreResult};

/// Global leaderboard backed by a single Redis sorted set
///
/// Key: `{ranking_key}` (default `video_ranking`), member = video id, score = cumulative score.
/// Increments use ZINCRBY so concurrent writers on the same member never lose updates.
#[derive(Clone)]
pub struct RedisRankingStore {
    redis: ConnectionManager,
    key: String,
}

impl RedisRankingStore {
    pub async fn connect(redis_url: &str, key: impl Into<String>) -> Result<Self> {
        let start = std::time::Instant::now();

        let client = Client::open(redis_url).context("failed to parse REDIS_URL connection string")?;
        let mut manager = ConnectionManager::new(client)
            .await
            .context("failed to initialize Redis connection manager")?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut manager)
            .await
            .context("Redis PING failed")?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Redis connection established"
        );

        Ok(Self::new(manager, key))
    }

    pub fn new(redis: ConnectionManager, key: impl Into<String>) -> Self {
        Self {
            redis,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.is_connection_refusal() {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Backend(err.to_string())
    }
}

#[async_trait]
impl RankingStore for RedisRankingStore {
    async fn increment(&self, video_id: &str, delta: f64) -> StoreResult<f64> {
        let new_score: f64 = self
            .redis
            .clone()
            .zincr(&self.key, video_id, delta)
            .await
            .map_err(map_redis_error)?;

        debug!(video_id, delta, new_score, "ZINCRBY applied");
        Ok(new_score)
    }

    async fn top(&self, limit: usize) -> StoreResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        // ZREVRANGE video_ranking 0 {limit-1}
        self.redis
            .clone()
            .zrevrange(&self.key, 0, (limit - 1) as isize)
            .await
            .map_err(map_redis_error)
    }

    async fn score(&self, video_id: &str) -> StoreResult<Option<f64>> {
        self.redis
            .clone()
            .zscore(&self.key, video_id)
            .await
            .map_err(map_redis_error)
    }

    async fn set_scores(&self, entries: &[(String, f64)]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipe = redis::pipe();
        for (video_id, score) in entries {
            pipe.zadd(&self.key, video_id, *score).ignore();
        }

        pipe.query_async::<_, ()>(&mut self.redis.clone())
            .await
            .map_err(map_redis_error)
    }
}
