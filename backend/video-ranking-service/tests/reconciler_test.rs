mod common;

use common::{engine_config, harness, RecordFault, DEADLINE};
use video_ranking_service::db::{RankingStore, RecordStore};
use video_ranking_service::error::{EngineError, StoreKind, UpstreamReason};
use video_ranking_service::jobs::reconcile_once;

async fn seed_records(h: &common::Harness) {
    for (id, score) in [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0), ("e", 5.0)] {
        h.records
            .inner
            .upsert_increment(id, "u1", score, false)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn test_ranking_failure_mid_pass_keeps_earlier_pages() {
    let h = harness(engine_config());
    seed_records(&h).await;
    h.ranking.fail_backend_after(1);

    let err = reconcile_once(h.ranking.as_ref(), h.records.as_ref(), 2, DEADLINE)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        EngineError::Upstream {
            store: StoreKind::RankingStore,
            reason: UpstreamReason::Backend,
            ..
        }
    ));
    assert_eq!(err.stage(), Some("ranking_store"));
    assert_eq!(h.ranking.inner.score("a").await.unwrap(), Some(1.0));
    assert_eq!(h.ranking.inner.score("b").await.unwrap(), Some(2.0));
    assert_eq!(h.ranking.inner.score("c").await.unwrap(), None);
    assert_eq!(h.ranking.inner.len().await, 2);
}

#[tokio::test]
async fn test_durable_scan_failure_writes_nothing() {
    let h = harness(engine_config());
    seed_records(&h).await;
    h.records.set_fault(RecordFault::Unavailable);

    let err = reconcile_once(h.ranking.as_ref(), h.records.as_ref(), 2, DEADLINE)
        .await
        .unwrap_err();

    assert_eq!(err.store(), Some(StoreKind::DurableStore));
    assert!(err.pending().is_none());
    assert_eq!(h.ranking.inner.len().await, 0);
}

#[tokio::test]
async fn test_pass_after_recovery_completes() {
    let h = harness(engine_config());
    seed_records(&h).await;
    h.ranking.fail_backend_after(1);
    reconcile_once(h.ranking.as_ref(), h.records.as_ref(), 2, DEADLINE)
        .await
        .unwrap_err();

    h.ranking.fail_backend(false);
    let written = reconcile_once(h.ranking.as_ref(), h.records.as_ref(), 2, DEADLINE)
        .await
        .unwrap();

    assert_eq!(written, 5);
    assert_eq!(h.ranking.inner.score("e").await.unwrap(), Some(5.0));
}
