use resilience::RetryConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::db::{RankingStore, RecordStore};
use crate::error::{EngineError, StoreKind};
use crate::metrics::INTERACTIONS_TOTAL;
use crate::models::{
    InteractionEvent, InteractionOutcome, InteractionType, PendingDurableWrite, Video,
};
use crate::services::{score_policy, upstream};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Reject interactions naming an owner other than the recorded one
    pub enforce_ownership: bool,
    /// Upper bound for a `watch_time` weight
    pub max_watch_time_weight: f64,
    /// Retry policy for the ranking-store increment
    pub ranking_retry: RetryConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enforce_ownership: false,
            max_watch_time_weight: 86_400.0,
            ranking_retry: RetryConfig::default(),
        }
    }
}

/// Applies interaction deltas to the ranking store and then the durable store
///
/// There is no transaction spanning the two stores. A durable failure after a
/// successful ranking increment is reported with the pending durable write so
/// that only that half is re-driven; re-applying the whole event would count
/// the ranking delta twice.
///
/// Once an event passes validation its store writes run on a spawned task, so
/// dropping the `apply` future does not abandon a half-applied interaction.
#[derive(Clone)]
pub struct RankingEngine {
    ranking: Arc<dyn RankingStore>,
    records: Arc<dyn RecordStore>,
    config: Arc<EngineConfig>,
}

impl RankingEngine {
    pub fn new(
        ranking: Arc<dyn RankingStore>,
        records: Arc<dyn RecordStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            ranking,
            records,
            config: Arc::new(config),
        }
    }

    /// Apply one interaction, each store call bounded by `deadline`.
    pub async fn apply(
        &self,
        event: InteractionEvent,
        deadline: Duration,
    ) -> Result<InteractionOutcome, EngineError> {
        let kind = event.kind;
        let result = self.apply_event(event, deadline).await;

        let outcome = match &result {
            Ok(_) => "updated",
            Err(EngineError::Validation(_)) => "rejected",
            Err(EngineError::ConstraintViolation { .. }) => "conflict",
            Err(EngineError::Upstream {
                store: StoreKind::RankingStore,
                ..
            }) => "ranking_store_failed",
            Err(EngineError::Upstream {
                store: StoreKind::DurableStore,
                ..
            }) => "durable_store_failed",
            Err(EngineError::OwnershipCheck { .. }) => "ownership_check_failed",
            Err(EngineError::Aborted(_)) => "aborted",
        };
        INTERACTIONS_TOTAL
            .with_label_values(&[kind.as_str(), outcome])
            .inc();

        result
    }

    /// Re-apply only the durable half of an interaction whose ranking write succeeded.
    pub async fn redrive_durable(
        &self,
        pending: PendingDurableWrite,
        deadline: Duration,
    ) -> Result<Video, EngineError> {
        self.write_durable(pending, deadline).await
    }

    async fn apply_event(
        &self,
        event: InteractionEvent,
        deadline: Duration,
    ) -> Result<InteractionOutcome, EngineError> {
        event.validate().map_err(EngineError::Validation)?;
        let delta = self.compute_delta(&event)?;

        let engine = self.clone();
        let video_id = event.video_id.clone();
        let worker = tokio::spawn(async move { engine.write_stores(event, delta, deadline).await });

        match worker.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(video_id = %video_id, error = %join_err, "Interaction worker aborted");
                Err(EngineError::Aborted(join_err.to_string()))
            }
        }
    }

    fn compute_delta(&self, event: &InteractionEvent) -> Result<f64, EngineError> {
        let delta = score_policy::delta(event.kind, event.weight)
            .map_err(|e| EngineError::Validation(e.to_string()))?;

        if event.kind == InteractionType::WatchTime {
            let max = self.config.max_watch_time_weight;
            if !delta.is_finite() || delta <= 0.0 || delta > max {
                return Err(EngineError::Validation(format!(
                    "watch_time weight must be greater than 0 and at most {}",
                    max
                )));
            }
        }

        Ok(delta)
    }

    async fn write_stores(
        &self,
        event: InteractionEvent,
        delta: f64,
        deadline: Duration,
    ) -> Result<InteractionOutcome, EngineError> {
        if self.config.enforce_ownership {
            self.check_owner(&event, deadline).await?;
        }

        let score = upstream::call_with_retry(
            StoreKind::RankingStore,
            "increment",
            deadline,
            self.config.ranking_retry.clone(),
            || self.ranking.increment(&event.video_id, delta),
        )
        .await?;
        debug!(video_id = %event.video_id, delta, score, "Ranking store updated");

        let pending = PendingDurableWrite {
            video_id: event.video_id,
            owner_id: event.owner_id,
            delta,
        };
        let video = self.write_durable(pending, deadline).await?;

        Ok(InteractionOutcome::updated(video.video_id, delta))
    }

    async fn check_owner(
        &self,
        event: &InteractionEvent,
        deadline: Duration,
    ) -> Result<(), EngineError> {
        let recorded = upstream::call(
            StoreKind::DurableStore,
            "owner_of",
            deadline,
            self.records.owner_of(&event.video_id),
        )
        .await
        .map_err(|err| match err {
            EngineError::Upstream { reason, detail, .. } => {
                warn!(video_id = %event.video_id, %reason, "Ownership check failed; nothing was written");
                EngineError::OwnershipCheck { reason, detail }
            }
            other => other,
        })?;

        match recorded {
            Some(owner) if owner != event.owner_id => {
                warn!(
                    video_id = %event.video_id,
                    recorded_owner = %owner,
                    requested_owner = %event.owner_id,
                    "Rejecting interaction for foreign owner"
                );
                Err(EngineError::ConstraintViolation {
                    video_id: event.video_id.clone(),
                })
            }
            _ => Ok(()),
        }
    }

    async fn write_durable(
        &self,
        pending: PendingDurableWrite,
        deadline: Duration,
    ) -> Result<Video, EngineError> {
        let result = upstream::call(
            StoreKind::DurableStore,
            "upsert_increment",
            deadline,
            self.records.upsert_increment(
                &pending.video_id,
                &pending.owner_id,
                pending.delta,
                self.config.enforce_ownership,
            ),
        )
        .await;

        match result {
            Ok(video) => {
                debug!(video_id = %video.video_id, score = video.score, "Durable store updated");
                Ok(video)
            }
            Err(EngineError::Upstream {
                store,
                reason,
                detail,
                ..
            }) => {
                error!(
                    video_id = %pending.video_id,
                    delta = pending.delta,
                    %reason,
                    "Durable write failed after ranking increment; stores diverge until re-driven"
                );
                Err(EngineError::Upstream {
                    store,
                    reason,
                    detail,
                    pending: Some(pending),
                })
            }
            Err(other) => {
                if matches!(other, EngineError::ConstraintViolation { .. }) {
                    warn!(
                        video_id = %pending.video_id,
                        delta = pending.delta,
                        "Owner changed between check and write; ranking delta was kept"
                    );
                }
                Err(other)
            }
        }
    }
}
