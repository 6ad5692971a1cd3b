//! Generation lifecycle integration tests.
//!
//! These drive the coordinator end to end with mock producers:
//! outline -> concurrent chunks -> retry -> merge -> persist

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::task::JoinHandle;

use waypoint_core::{
    generation::{
        ChunkProducer, GenerationEvent, OutlineFailure, OutlineFailureReason, OutlineProducer,
        PersistenceStatus,
    },
    persistence::{PersistenceError, PersistenceSink, StorageKind},
    testing::{fixtures, MockChunkProducer, MockOutlineProducer, MockPersistenceSink, MockPlanStore},
    Caller, DayRange, DayStatus, FallbackSink, GenerationConfig, GenerationCoordinator,
    GenerationHandle, GenerationPhase, JsonFilePlanStore, ProgressSnapshot, RetryError,
    TripDuration, TripPreferences,
};

const WAIT: Duration = Duration::from_secs(5);

/// Test helper that wires mocks into a running coordinator.
struct TestHarness {
    outline: Arc<MockOutlineProducer>,
    chunks: Arc<MockChunkProducer>,
    sink: Arc<MockPersistenceSink>,
    handle: GenerationHandle,
    task: JoinHandle<()>,
}

impl TestHarness {
    fn new(config: GenerationConfig) -> Self {
        let sink = Arc::new(MockPersistenceSink::new());
        Self::with_sink(config, sink.clone(), sink)
    }

    fn with_sink(
        config: GenerationConfig,
        sink: Arc<MockPersistenceSink>,
        wired_sink: Arc<dyn PersistenceSink>,
    ) -> Self {
        let outline = Arc::new(MockOutlineProducer::new());
        let chunks = Arc::new(MockChunkProducer::new());
        let (handle, coordinator) = GenerationCoordinator::new(
            config,
            Arc::clone(&outline) as Arc<dyn OutlineProducer>,
            Arc::clone(&chunks) as Arc<dyn ChunkProducer>,
            wired_sink,
        );
        let task = tokio::spawn(coordinator.run());
        Self {
            outline,
            chunks,
            sink,
            handle,
            task,
        }
    }

    async fn wait_for(&self, predicate: impl FnMut(&ProgressSnapshot) -> bool) -> ProgressSnapshot {
        tokio::time::timeout(WAIT, self.handle.wait_until(predicate))
            .await
            .expect("Timed out waiting for snapshot")
            .expect("Coordinator closed")
    }

    async fn wait_settled(&self) -> ProgressSnapshot {
        self.wait_for(|s| s.is_settled()).await
    }

    async fn wait_persisted(&self) -> ProgressSnapshot {
        self.wait_for(|s| s.persisted_receipt().is_some()).await
    }

    async fn stop(self) {
        self.handle.shutdown().await.expect("Failed to shut down");
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("Coordinator did not stop")
            .expect("Coordinator panicked");
    }
}

fn config() -> GenerationConfig {
    GenerationConfig {
        max_chunk_days: 3,
        ..Default::default()
    }
}

fn kyoto(days: u32) -> TripPreferences {
    fixtures::preferences("Kyoto", days)
}

#[tokio::test]
async fn test_happy_path_generates_and_persists_once() {
    let harness = TestHarness::new(config());
    let run_id = harness
        .handle
        .start(kyoto(7), Caller::user("u-1"))
        .await
        .unwrap();

    let snapshot = harness.wait_persisted().await;
    assert_eq!(snapshot.run_id.as_ref(), Some(&run_id));
    assert_eq!(snapshot.phase, GenerationPhase::Completed);
    assert_eq!(snapshot.total_days, 7);
    assert_eq!(snapshot.completed_day_count, 7);
    assert_eq!(
        snapshot.chunks,
        vec![DayRange::new(1, 3), DayRange::new(4, 6), DayRange::new(7, 7)]
    );
    assert_eq!(
        snapshot.persisted_receipt().unwrap().kind,
        StorageKind::Durable
    );

    let itinerary = harness.handle.itinerary().await.unwrap().unwrap();
    let days: Vec<u32> = itinerary.days.iter().map(|d| d.day).collect();
    assert_eq!(days, (1..=7).collect::<Vec<_>>());
    assert_eq!(itinerary.destination, "Kyoto");

    // Nothing re-triggers the save.
    tokio::time::sleep(Duration::from_millis(50)).await;
    let persisted = harness.sink.recorded().await;
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].itinerary.id, itinerary.id);
    assert_eq!(persisted[0].caller, Caller::user("u-1"));

    harness.stop().await;
}

#[tokio::test]
async fn test_partial_failure_then_retry() {
    let harness = TestHarness::new(config());
    harness.chunks.fail_range(DayRange::new(4, 6), 1).await;

    harness
        .handle
        .start(kyoto(9), Caller::anonymous())
        .await
        .unwrap();

    let snapshot = harness.wait_settled().await;
    assert_eq!(snapshot.phase, GenerationPhase::GeneratingDetails);
    assert_eq!(snapshot.failed_days, vec![4, 5, 6]);
    assert_eq!(snapshot.days_with(DayStatus::Completed), vec![1, 2, 3, 7, 8, 9]);
    assert_eq!(snapshot.completed_day_count, 6);
    assert_eq!(harness.sink.persist_count().await, 0);
    assert!(harness.handle.itinerary().await.unwrap().is_none());

    harness.handle.retry(DayRange::new(4, 6)).await.unwrap();

    let snapshot = harness.wait_persisted().await;
    assert_eq!(snapshot.phase, GenerationPhase::Completed);
    assert!(snapshot.failed_days.is_empty());
    assert_eq!(harness.chunks.calls_for(DayRange::new(4, 6)).await, 2);
    assert_eq!(harness.chunks.calls_for(DayRange::new(1, 3)).await, 1);
    assert_eq!(harness.sink.persist_count().await, 1);
    assert_eq!(
        snapshot.persisted_receipt().unwrap().kind,
        StorageKind::Local
    );

    let itinerary = harness.handle.itinerary().await.unwrap().unwrap();
    assert_eq!(itinerary.days.len(), 9);

    harness.stop().await;
}

#[tokio::test]
async fn test_out_of_order_completion_merges_in_day_order() {
    let harness = TestHarness::new(config());
    harness
        .chunks
        .set_delay(DayRange::new(1, 3), Duration::from_millis(150))
        .await;
    let mut events = harness.handle.subscribe();

    harness
        .handle
        .start(kyoto(6), Caller::anonymous())
        .await
        .unwrap();
    harness.wait_persisted().await;

    let mut completed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let GenerationEvent::ChunkCompleted { range, .. } = event {
            completed.push(range);
        }
    }
    assert_eq!(completed, vec![DayRange::new(4, 6), DayRange::new(1, 3)]);

    let itinerary = harness.handle.itinerary().await.unwrap().unwrap();
    let days: Vec<u32> = itinerary.days.iter().map(|d| d.day).collect();
    assert_eq!(days, vec![1, 2, 3, 4, 5, 6]);

    harness.stop().await;
}

#[tokio::test]
async fn test_retry_guard_rejects_non_failed_days() {
    let harness = TestHarness::new(config());
    harness.chunks.always_fail(DayRange::new(4, 6)).await;
    harness
        .chunks
        .set_delay(DayRange::new(7, 9), Duration::from_millis(300))
        .await;

    harness
        .handle
        .start(kyoto(9), Caller::anonymous())
        .await
        .unwrap();
    harness
        .wait_for(|s| s.failed_days == vec![4, 5, 6] && s.status_of(1) == Some(DayStatus::Completed))
        .await;

    // Completed day in range.
    let err = harness.handle.retry(DayRange::new(3, 5)).await.unwrap_err();
    assert!(matches!(err, RetryError::NotFailed { day: 3, .. }));

    // Generating days.
    let err = harness.handle.retry(DayRange::new(7, 9)).await.unwrap_err();
    assert!(matches!(
        err,
        RetryError::NotFailed {
            day: 7,
            status: DayStatus::Generating
        }
    ));

    // Beyond the trip.
    let err = harness.handle.retry(DayRange::new(8, 12)).await.unwrap_err();
    assert!(matches!(err, RetryError::InvalidRange { .. }));

    // Rejections leave the state untouched.
    let snapshot = harness.handle.progress();
    assert_eq!(snapshot.failed_days, vec![4, 5, 6]);
    assert_eq!(harness.chunks.calls_for(DayRange::new(4, 6)).await, 1);

    // A sub-range of failed days is fine.
    harness.handle.retry(DayRange::new(5, 6)).await.unwrap();

    harness.stop().await;
}

#[tokio::test]
async fn test_retry_attempts_are_capped() {
    let harness = TestHarness::new(GenerationConfig {
        max_chunk_attempts: 2,
        ..config()
    });
    harness.chunks.always_fail(DayRange::new(1, 3)).await;

    harness
        .handle
        .start(kyoto(3), Caller::anonymous())
        .await
        .unwrap();
    harness.wait_settled().await;

    harness.handle.retry(DayRange::new(1, 3)).await.unwrap();
    harness
        .wait_for(|s| s.is_settled() && s.failed_days == vec![1, 2, 3])
        .await;
    assert_eq!(harness.chunks.calls_for(DayRange::new(1, 3)).await, 2);

    let err = harness.handle.retry(DayRange::new(1, 3)).await.unwrap_err();
    assert!(matches!(
        err,
        RetryError::AttemptsExhausted {
            max_attempts: 2,
            ..
        }
    ));

    harness.stop().await;
}

#[tokio::test]
async fn test_retry_failed_relaunches_every_failed_chunk() {
    let harness = TestHarness::new(config());
    harness.chunks.fail_range(DayRange::new(1, 3), 1).await;
    harness.chunks.fail_range(DayRange::new(7, 9), 1).await;

    harness
        .handle
        .start(kyoto(9), Caller::anonymous())
        .await
        .unwrap();
    let snapshot = harness.wait_settled().await;
    assert_eq!(snapshot.failed_days, vec![1, 2, 3, 7, 8, 9]);

    let launched = harness.handle.retry_failed().await.unwrap();
    assert_eq!(launched, vec![DayRange::new(1, 3), DayRange::new(7, 9)]);

    let snapshot = harness.wait_persisted().await;
    assert_eq!(snapshot.completed_day_count, 9);
    assert_eq!(harness.sink.persist_count().await, 1);

    harness.stop().await;
}

#[tokio::test]
async fn test_outline_rate_limited_stops_before_chunks() {
    let harness = TestHarness::new(config());
    harness
        .outline
        .set_failure(OutlineFailure::rate_limited("daily limit", Some(60)))
        .await;

    harness
        .handle
        .start(kyoto(5), Caller::anonymous())
        .await
        .unwrap();
    let snapshot = harness
        .wait_for(|s| s.phase == GenerationPhase::Error)
        .await;

    let error = snapshot.error.expect("outline error in snapshot");
    assert_eq!(error.reason, OutlineFailureReason::RateLimited);
    assert_eq!(error.retry_after_secs, Some(60));
    assert!(snapshot.status_by_day.is_empty());
    assert!(harness.chunks.requests().await.is_empty());

    let err = harness.handle.retry(DayRange::new(1, 3)).await.unwrap_err();
    assert!(matches!(
        err,
        RetryError::NotGenerating {
            phase: GenerationPhase::Error
        }
    ));

    harness.stop().await;
}

#[tokio::test]
async fn test_new_run_discards_stale_results() {
    let harness = TestHarness::new(config());
    harness
        .chunks
        .set_delay(DayRange::new(1, 3), Duration::from_millis(200))
        .await;

    let first = harness
        .handle
        .start(kyoto(3), Caller::anonymous())
        .await
        .unwrap();
    harness
        .wait_for(|s| s.status_of(1) == Some(DayStatus::Generating))
        .await;

    let second = harness
        .handle
        .start(fixtures::preferences("Osaka", 2), Caller::anonymous())
        .await
        .unwrap();
    assert_ne!(first, second);

    let snapshot = harness.wait_persisted().await;
    assert_eq!(snapshot.run_id.as_ref(), Some(&second));
    assert_eq!(snapshot.total_days, 2);

    // Let the first run's slow chunk land.
    tokio::time::sleep(Duration::from_millis(300)).await;
    let snapshot = harness.handle.progress();
    assert_eq!(snapshot.run_id.as_ref(), Some(&second));
    assert_eq!(snapshot.total_days, 2);

    let persisted = harness.sink.recorded().await;
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].itinerary.destination, "Osaka");

    harness.stop().await;
}

#[tokio::test]
async fn test_lead_chunk_first_defers_remaining_chunks() {
    let harness = TestHarness::new(GenerationConfig {
        lead_chunk_first: true,
        ..config()
    });
    harness
        .chunks
        .set_delay(DayRange::new(1, 3), Duration::from_millis(100))
        .await;

    harness
        .handle
        .start(kyoto(6), Caller::anonymous())
        .await
        .unwrap();
    let snapshot = harness
        .wait_for(|s| s.status_of(1) == Some(DayStatus::Generating))
        .await;
    assert_eq!(snapshot.status_of(4), Some(DayStatus::Pending));

    harness.wait_persisted().await;
    let order: Vec<DayRange> = harness
        .chunks
        .requests()
        .await
        .iter()
        .map(|r| r.range)
        .collect();
    assert_eq!(order, vec![DayRange::new(1, 3), DayRange::new(4, 6)]);

    harness.stop().await;
}

#[tokio::test]
async fn test_undecided_duration_uses_outline_length() {
    let harness = TestHarness::new(config());
    let prefs = TripPreferences::undecided(Some("Iberia".to_string()), TripDuration::Undecided);

    harness
        .handle
        .start(prefs, Caller::anonymous())
        .await
        .unwrap();
    let snapshot = harness.wait_persisted().await;

    assert_eq!(snapshot.total_days, 3);
    let requests = harness.chunks.requests().await;
    assert_eq!(requests[0].preferences.duration, TripDuration::Days(3));
    assert!(requests[0].preferences.destination_decided);

    harness.stop().await;
}

#[tokio::test]
async fn test_chunk_requests_carry_continuity() {
    let harness = TestHarness::new(config());
    harness
        .handle
        .start(kyoto(6), Caller::anonymous())
        .await
        .unwrap();
    harness.wait_persisted().await;

    let requests = harness.chunks.requests().await;
    let second = requests
        .iter()
        .find(|r| r.range == DayRange::new(4, 6))
        .expect("second chunk requested");
    assert_eq!(
        second.previous_overnight_location.as_deref(),
        Some("Kyoto stop 1")
    );
    let outline_days: Vec<u32> = second.outline_days.iter().map(|d| d.day).collect();
    assert_eq!(outline_days, vec![4, 5, 6]);

    harness.stop().await;
}

#[tokio::test]
async fn test_persistence_failure_can_be_retried() {
    let harness = TestHarness::new(config());
    harness
        .sink
        .set_next_error(PersistenceError::Database("database is locked".to_string()))
        .await;

    harness
        .handle
        .start(kyoto(3), Caller::user("u-1"))
        .await
        .unwrap();
    let snapshot = harness
        .wait_for(|s| matches!(s.persistence, PersistenceStatus::Failed { .. }))
        .await;
    assert_eq!(snapshot.phase, GenerationPhase::Completed);

    harness.handle.retry_persistence().await.unwrap();
    harness.wait_persisted().await;
    assert_eq!(harness.sink.persist_count().await, 2);

    // Saved runs cannot be re-saved.
    assert!(harness.handle.retry_persistence().await.is_err());

    harness.stop().await;
}

#[tokio::test]
async fn test_durable_outage_falls_back_to_local_files() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let durable = Arc::new(MockPlanStore::new(StorageKind::Durable));
    durable.set_next_error("connection refused");
    let local = Arc::new(JsonFilePlanStore::new(temp_dir.path()).expect("Failed to create store"));
    let fallback = Arc::new(FallbackSink::new(durable.clone(), local.clone()));

    let unused = Arc::new(MockPersistenceSink::new());
    let harness = TestHarness::with_sink(config(), unused, fallback.clone());
    harness
        .handle
        .start(kyoto(4), Caller::user("u-1"))
        .await
        .unwrap();

    let snapshot = harness.wait_persisted().await;
    let receipt = snapshot.persisted_receipt().unwrap();
    assert_eq!(receipt.kind, StorageKind::Local);
    assert!(durable.saved().is_empty());

    let plan = fallback
        .lookup(&receipt.reference)
        .unwrap()
        .expect("plan saved locally");
    assert_eq!(plan.owner.as_deref(), Some("u-1"));
    assert_eq!(plan.itinerary.days.len(), 4);

    harness.stop().await;
}

#[tokio::test]
async fn test_chunk_timeout_marks_days_failed() {
    let harness = TestHarness::new(GenerationConfig {
        chunk_timeout_secs: 1,
        ..config()
    });
    harness
        .chunks
        .set_delay(DayRange::new(4, 5), Duration::from_secs(3))
        .await;
    let mut events = harness.handle.subscribe();

    harness
        .handle
        .start(kyoto(5), Caller::anonymous())
        .await
        .unwrap();
    let snapshot = harness.wait_settled().await;
    assert_eq!(snapshot.failed_days, vec![4, 5]);

    let mut timed_out = false;
    while let Ok(event) = events.try_recv() {
        if let GenerationEvent::ChunkFailed { range, reason, .. } = event {
            assert_eq!(range, DayRange::new(4, 5));
            assert_eq!(reason.as_str(), "timeout");
            timed_out = true;
        }
    }
    assert!(timed_out);

    harness.stop().await;
}

#[tokio::test]
async fn test_panicking_chunk_producer_marks_days_failed() {
    let harness = TestHarness::new(GenerationConfig {
        chunk_timeout_secs: 1,
        ..config()
    });
    harness.chunks.panic_range(DayRange::new(4, 6), 1).await;

    harness
        .handle
        .start(kyoto(9), Caller::anonymous())
        .await
        .unwrap();
    let snapshot = harness.wait_settled().await;

    assert_eq!(snapshot.phase, GenerationPhase::GeneratingDetails);
    assert_eq!(snapshot.failed_days, vec![4, 5, 6]);
    assert!(snapshot.generating_days.is_empty());
    assert_eq!(snapshot.completed_day_count, 6);

    harness.handle.retry(DayRange::new(4, 6)).await.unwrap();
    let snapshot = harness.wait_persisted().await;
    assert_eq!(snapshot.phase, GenerationPhase::Completed);
    assert_eq!(harness.chunks.calls_for(DayRange::new(4, 6)).await, 2);

    let itinerary = harness.handle.itinerary().await.unwrap().unwrap();
    assert_eq!(itinerary.days.len(), 9);

    harness.stop().await;
}

#[tokio::test]
async fn test_oversized_duration_is_rejected() {
    let harness = TestHarness::new(GenerationConfig {
        max_trip_days: 5,
        ..config()
    });

    for days in [6, u32::MAX] {
        harness
            .handle
            .start(kyoto(days), Caller::anonymous())
            .await
            .unwrap();
        let snapshot = harness
            .wait_for(|s| s.phase == GenerationPhase::Error)
            .await;

        let error = snapshot.error.expect("outline error in snapshot");
        assert_eq!(error.reason, OutlineFailureReason::InvalidInput);
        assert_eq!(snapshot.total_days, 0);
        assert!(snapshot.chunks.is_empty());
    }
    assert_eq!(harness.outline.call_count().await, 0);

    // The coordinator keeps serving runs within the limit.
    harness
        .handle
        .start(kyoto(5), Caller::anonymous())
        .await
        .unwrap();
    let snapshot = harness.wait_persisted().await;
    assert_eq!(snapshot.total_days, 5);

    harness.stop().await;
}

#[tokio::test]
async fn test_oversized_outline_for_undecided_duration_fails() {
    let harness = TestHarness::new(GenerationConfig {
        max_trip_days: 5,
        ..config()
    });
    harness
        .outline
        .set_result(fixtures::outline_result("Kyoto", 8))
        .await;

    let prefs = TripPreferences::new("Kyoto", TripDuration::Undecided);
    harness
        .handle
        .start(prefs, Caller::anonymous())
        .await
        .unwrap();
    let snapshot = harness
        .wait_for(|s| s.phase == GenerationPhase::Error)
        .await;

    assert_eq!(
        snapshot.error.map(|e| e.reason),
        Some(OutlineFailureReason::InvalidInput)
    );
    assert!(harness.chunks.requests().await.is_empty());

    harness.stop().await;
}

#[tokio::test]
async fn test_panicking_sink_marks_persistence_failed() {
    let harness = TestHarness::new(config());
    harness.sink.panic_next().await;

    harness
        .handle
        .start(kyoto(3), Caller::user("u-1"))
        .await
        .unwrap();
    let snapshot = harness
        .wait_for(|s| matches!(s.persistence, PersistenceStatus::Failed { .. }))
        .await;
    assert_eq!(snapshot.phase, GenerationPhase::Completed);
    assert_eq!(harness.sink.persist_count().await, 0);

    harness.handle.retry_persistence().await.unwrap();
    let snapshot = harness.wait_persisted().await;
    assert_eq!(
        snapshot.persisted_receipt().unwrap().kind,
        StorageKind::Durable
    );
    assert_eq!(harness.sink.persist_count().await, 1);

    harness.stop().await;
}
