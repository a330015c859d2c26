#![allow(dead_code)]

use async_trait::async_trait;
use resilience::RetryConfig;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use video_ranking_service::db::{
    MemoryRankingStore, MemoryRecordStore, RankingStore, RecordStore, StoreError, StoreResult,
};
use video_ranking_service::models::Video;
use video_ranking_service::services::EngineConfig;
use video_ranking_service::state::AppState;

pub const DEADLINE: Duration = Duration::from_millis(500);

/// Engine config with fast, deterministic retries
pub fn engine_config() -> EngineConfig {
    EngineConfig {
        ranking_retry: RetryConfig {
            max_retries: 2,
            initial_backoff: Duration::from_millis(1),
            jitter: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Ranking store that can be told to fail before delegating to memory
#[derive(Default)]
pub struct FlakyRankingStore {
    pub inner: MemoryRankingStore,
    unavailable_left: AtomicU32,
    backend_error: AtomicBool,
    backend_after: Mutex<Option<u32>>,
    pub increment_calls: AtomicU32,
}

impl FlakyRankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `n` calls as if the connection was refused.
    pub fn fail_unavailable(&self, n: u32) {
        self.unavailable_left.store(n, Ordering::SeqCst);
    }

    /// Switch backend failures on or off; off also clears `fail_backend_after`.
    pub fn fail_backend(&self, on: bool) {
        self.backend_error.store(on, Ordering::SeqCst);
        if !on {
            *self.backend_after.lock().unwrap() = None;
        }
    }

    /// Let `n` more calls through, then fail every call with a backend error.
    pub fn fail_backend_after(&self, n: u32) {
        *self.backend_after.lock().unwrap() = Some(n);
    }

    fn check(&self) -> StoreResult<()> {
        if self.backend_error.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("ERR injected failure".into()));
        }
        if let Some(left) = self.backend_after.lock().unwrap().as_mut() {
            if *left == 0 {
                return Err(StoreError::Backend("ERR injected failure".into()));
            }
            *left -= 1;
        }
        let refused = self
            .unavailable_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(StoreError::Unavailable("Connection refused (os error 111)".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RankingStore for FlakyRankingStore {
    async fn increment(&self, video_id: &str, delta: f64) -> StoreResult<f64> {
        self.increment_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.increment(video_id, delta).await
    }

    async fn top(&self, limit: usize) -> StoreResult<Vec<String>> {
        self.check()?;
        self.inner.top(limit).await
    }

    async fn score(&self, video_id: &str) -> StoreResult<Option<f64>> {
        self.inner.score(video_id).await
    }

    async fn set_scores(&self, entries: &[(String, f64)]) -> StoreResult<()> {
        self.check()?;
        self.inner.set_scores(entries).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordFault {
    Healthy,
    Unavailable,
    /// Sleep before every call
    Slow(Duration),
}

/// Record store with an injectable fault in front of the memory store
pub struct FaultyRecordStore {
    pub inner: MemoryRecordStore,
    fault: Mutex<RecordFault>,
}

impl FaultyRecordStore {
    pub fn new(fault: RecordFault) -> Self {
        Self {
            inner: MemoryRecordStore::new(),
            fault: Mutex::new(fault),
        }
    }

    pub fn set_fault(&self, fault: RecordFault) {
        *self.fault.lock().unwrap() = fault;
    }

    async fn check(&self) -> StoreResult<()> {
        let fault = *self.fault.lock().unwrap();
        match fault {
            RecordFault::Healthy => Ok(()),
            RecordFault::Unavailable => Err(StoreError::Unavailable("pool timed out".into())),
            RecordFault::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RecordStore for FaultyRecordStore {
    async fn upsert_increment(
        &self,
        video_id: &str,
        owner_id: &str,
        delta: f64,
        enforce_owner: bool,
    ) -> StoreResult<Video> {
        self.check().await?;
        self.inner
            .upsert_increment(video_id, owner_id, delta, enforce_owner)
            .await
    }

    async fn top_by_owner(&self, owner_id: &str, limit: usize) -> StoreResult<Vec<Video>> {
        self.check().await?;
        self.inner.top_by_owner(owner_id, limit).await
    }

    async fn owner_of(&self, video_id: &str) -> StoreResult<Option<String>> {
        self.check().await?;
        self.inner.owner_of(video_id).await
    }

    async fn scan(&self, after: Option<&str>, limit: usize) -> StoreResult<Vec<Video>> {
        self.check().await?;
        self.inner.scan(after, limit).await
    }
}

pub struct Harness {
    pub state: AppState,
    pub ranking: Arc<FlakyRankingStore>,
    pub records: Arc<FaultyRecordStore>,
}

pub fn harness(config: EngineConfig) -> Harness {
    let ranking = Arc::new(FlakyRankingStore::new());
    let records = Arc::new(FaultyRecordStore::new(RecordFault::Healthy));
    let state = AppState::new(ranking.clone(), records.clone(), config, DEADLINE, 100);
    Harness {
        state,
        ranking,
        records,
    }
}
