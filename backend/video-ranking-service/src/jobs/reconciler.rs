//! Ranking store reconciliation background job
//!
//! The two stores share no transaction, so a durable failure after a ranking
//! increment (or a lost Redis dataset) leaves them apart. This job periodically
//! rewrites ranking-store scores from the durable records, which are the source
//! of truth. Entities known only to the ranking store are left untouched.
//!
//! Increments landing between a page read and its write-back can be overwritten
//! by the older durable value until the next interaction or pass.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::ReconcileConfig;
use crate::db::{RankingStore, RecordStore};
use crate::error::{EngineError, StoreKind};
use crate::metrics::RECONCILED_ENTITIES_TOTAL;
use crate::services::upstream;

/// Run one full pass; returns the number of entities written.
pub async fn reconcile_once(
    ranking: &dyn RankingStore,
    records: &dyn RecordStore,
    batch_size: usize,
    deadline: Duration,
) -> Result<usize, EngineError> {
    let batch_size = batch_size.max(1);
    let mut cursor: Option<String> = None;
    let mut written = 0;

    loop {
        let page = upstream::call(
            StoreKind::DurableStore,
            "scan",
            deadline,
            records.scan(cursor.as_deref(), batch_size),
        )
        .await?;
        if page.is_empty() {
            break;
        }

        let entries: Vec<(String, f64)> = page
            .iter()
            .map(|video| (video.video_id.clone(), video.score))
            .collect();
        upstream::call(
            StoreKind::RankingStore,
            "set_scores",
            deadline,
            ranking.set_scores(&entries),
        )
        .await?;

        written += entries.len();
        RECONCILED_ENTITIES_TOTAL.inc_by(entries.len() as u64);

        if page.len() < batch_size {
            break;
        }
        cursor = page.last().map(|video| video.video_id.clone());
    }

    Ok(written)
}

/// Start the periodic reconciliation job
///
/// Returns immediately when the configured interval is zero.
pub async fn start_reconciler(
    ranking: Arc<dyn RankingStore>,
    records: Arc<dyn RecordStore>,
    config: ReconcileConfig,
    deadline: Duration,
) {
    if !config.enabled() {
        tracing::info!("Ranking reconciliation disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.interval.as_secs(),
        batch_size = config.batch_size,
        "Starting ranking reconciliation job"
    );

    loop {
        sleep(config.interval).await;

        match reconcile_once(ranking.as_ref(), records.as_ref(), config.batch_size, deadline).await
        {
            Ok(written) => tracing::info!(written, "Ranking store reconciled"),
            Err(e) => tracing::warn!(error = %e, "Ranking reconciliation pass failed"),
        }
    }
}
