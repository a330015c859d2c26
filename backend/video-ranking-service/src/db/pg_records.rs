use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{RecordStore, StoreError, StoreResult};
use crate::models::Video;

/// Repository for durable video score records
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Io(ref io) if io.kind() == std::io::ErrorKind::ConnectionRefused => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn upsert_increment(
        &self,
        video_id: &str,
        owner_id: &str,
        delta: f64,
        enforce_owner: bool,
    ) -> StoreResult<Video> {
        // Single statement: the increment happens server-side, so concurrent
        // writers to the same video never read a stale score.
        let updated = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (video_id, user_id, score)
            VALUES ($1, $2, $3)
            ON CONFLICT (video_id) DO UPDATE
            SET score = videos.score + EXCLUDED.score,
                updated_at = NOW()
            WHERE NOT $4 OR videos.user_id = EXCLUDED.user_id
            RETURNING video_id, user_id, score
            "#,
        )
        .bind(video_id)
        .bind(owner_id)
        .bind(delta)
        .bind(enforce_owner)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match updated {
            Some(video) => {
                debug!(video_id, delta, score = video.score, "Video score upserted");
                Ok(video)
            }
            None => {
                let recorded_owner = self.owner_of(video_id).await?.unwrap_or_default();
                Err(StoreError::OwnershipConflict {
                    video_id: video_id.to_string(),
                    recorded_owner,
                })
            }
        }
    }

    async fn top_by_owner(&self, owner_id: &str, limit: usize) -> StoreResult<Vec<Video>> {
        sqlx::query_as::<_, Video>(
            r#"
            SELECT video_id, user_id, score
            FROM videos
            WHERE user_id = $1
            ORDER BY score DESC, video_id ASC
            LIMIT $2
            "#,
        )
        .bind(owner_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn owner_of(&self, video_id: &str) -> StoreResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT user_id FROM videos WHERE video_id = $1")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn scan(&self, after: Option<&str>, limit: usize) -> StoreResult<Vec<Video>> {
        sqlx::query_as::<_, Video>(
            r#"
            SELECT video_id, user_id, score
            FROM videos
            WHERE $1::TEXT IS NULL OR video_id > $1
            ORDER BY video_id ASC
            LIMIT $2
            "#,
        )
        .bind(after)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::pool::{create_pool, migrate, PoolConfig};
    use std::sync::Arc;

    async fn test_store() -> Option<PgRecordStore> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let pool = create_pool(&PoolConfig {
            database_url: url,
            ..Default::default()
        })
        .await
        .ok()?;
        migrate(&pool).await.ok()?;
        Some(PgRecordStore::new(pool))
    }

    #[test]
    fn test_pool_timeout_is_retriable() {
        assert!(map_sqlx_error(sqlx::Error::PoolTimedOut).is_retriable());
        assert!(!map_sqlx_error(sqlx::Error::RowNotFound).is_retriable());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_concurrent_upserts_do_not_lose_updates() {
        let Some(store) = test_store().await else {
            return;
        };
        let store = Arc::new(store);
        let video_id = format!("pg-concurrent-{}", std::process::id());

        let handles: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                let video_id = video_id.clone();
                tokio::spawn(async move {
                    store
                        .upsert_increment(&video_id, "owner", 1.0, false)
                        .await
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let top = store.top_by_owner("owner", 1000).await.unwrap();
        let video = top.iter().find(|v| v.video_id == video_id).unwrap();
        assert_eq!(video.score, 50.0);

        sqlx::query("DELETE FROM videos WHERE video_id = $1")
            .bind(&video_id)
            .execute(store.pool())
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_enforced_owner_mismatch_against_postgres() {
        let Some(store) = test_store().await else {
            return;
        };
        let video_id = format!("pg-owner-{}", std::process::id());

        store.upsert_increment(&video_id, "alice", 1.0, true).await.unwrap();
        let err = store
            .upsert_increment(&video_id, "mallory", 5.0, true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::OwnershipConflict { ref recorded_owner, .. } if recorded_owner == "alice"));

        // Lenient mode keeps the original owner and still applies the delta.
        let video = store.upsert_increment(&video_id, "mallory", 2.0, false).await.unwrap();
        assert_eq!(video.user_id, "alice");
        assert_eq!(video.score, 3.0);

        sqlx::query("DELETE FROM videos WHERE video_id = $1")
            .bind(&video_id)
            .execute(store.pool())
            .await
            .unwrap();
    }
}
