//! In-process stores with the same semantics as the Redis and PostgreSQL adapters.
//!
//! Each operation runs under a single lock, so increments are atomic. Used by the
//! test suite and by local runs with `STORE_BACKEND=memory`.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use super::{RankingStore, RecordStore, StoreError, StoreResult};
use crate::models::Video;

#[derive(Default)]
pub struct MemoryRankingStore {
    scores: Mutex<HashMap<String, f64>>,
}

impl MemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.scores.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.scores.lock().await.is_empty()
    }
}

#[async_trait]
impl RankingStore for MemoryRankingStore {
    async fn increment(&self, video_id: &str, delta: f64) -> StoreResult<f64> {
        let mut scores = self.scores.lock().await;
        let score = scores.entry(video_id.to_string()).or_insert(0.0);
        *score += delta;
        Ok(*score)
    }

    async fn top(&self, limit: usize) -> StoreResult<Vec<String>> {
        let scores = self.scores.lock().await;
        let mut entries: Vec<(&String, &f64)> = scores.iter().collect();
        // Same order as ZREVRANGE: score desc, then member desc
        entries.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| b.0.cmp(a.0)));
        Ok(entries
            .into_iter()
            .take(limit)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn score(&self, video_id: &str) -> StoreResult<Option<f64>> {
        Ok(self.scores.lock().await.get(video_id).copied())
    }

    async fn set_scores(&self, entries: &[(String, f64)]) -> StoreResult<()> {
        let mut scores = self.scores.lock().await;
        for (video_id, score) in entries {
            scores.insert(video_id.clone(), *score);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    videos: Mutex<BTreeMap<String, Video>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, video_id: &str) -> Option<Video> {
        self.videos.lock().await.get(video_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.videos.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.videos.lock().await.is_empty()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn upsert_increment(
        &self,
        video_id: &str,
        owner_id: &str,
        delta: f64,
        enforce_owner: bool,
    ) -> StoreResult<Video> {
        let mut videos = self.videos.lock().await;
        match videos.get_mut(video_id) {
            Some(existing) => {
                if enforce_owner && existing.user_id != owner_id {
                    return Err(StoreError::OwnershipConflict {
                        video_id: video_id.to_string(),
                        recorded_owner: existing.user_id.clone(),
                    });
                }
                existing.score += delta;
                Ok(existing.clone())
            }
            None => {
                let video = Video {
                    video_id: video_id.to_string(),
                    user_id: owner_id.to_string(),
                    score: delta,
                };
                videos.insert(video_id.to_string(), video.clone());
                Ok(video)
            }
        }
    }

    async fn top_by_owner(&self, owner_id: &str, limit: usize) -> StoreResult<Vec<Video>> {
        let videos = self.videos.lock().await;
        // BTreeMap iteration is id-ascending; the stable sort keeps that as the tie-break
        let mut owned: Vec<Video> = videos
            .values()
            .filter(|v| v.user_id == owner_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.score.total_cmp(&a.score));
        owned.truncate(limit);
        Ok(owned)
    }

    async fn owner_of(&self, video_id: &str) -> StoreResult<Option<String>> {
        Ok(self
            .videos
            .lock()
            .await
            .get(video_id)
            .map(|v| v.user_id.clone()))
    }

    async fn scan(&self, after: Option<&str>, limit: usize) -> StoreResult<Vec<Video>> {
        let videos = self.videos.lock().await;
        Ok(videos
            .values()
            .filter(|v| after.map_or(true, |a| v.video_id.as_str() > a))
            .take(limit)
            .cloned()
            .collect())
    }
}
