use std::sync::Arc;

use chrono::{Duration, Utc};
use grid_core::job_kind::JobKind;
use grid_core::queue_health::QueueHealth;
use grid_core::types::{EntityId, Timestamp};
use grid_db::models::job::NewJob;
use grid_db::models::request::{CreateRequest, GenerationRequest};
use grid_db::models::worker::{CreateWorker, Worker};
use grid_db::{JobStore, MemoryStore};
use grid_events::alerts::{TITLE_JOB_ABORTED, TITLE_QUEUE_CLEANED, TITLE_STUCK_JOBS};
use grid_events::{Dispatcher, Notifier, RecordingSink};
use grid_monitor::{run_sweep, SweepOptions};
use uuid::Uuid;

struct Queue {
    store: MemoryStore,
    worker: Worker,
    request: GenerationRequest,
    now: Timestamp,
}

impl Queue {
    fn new() -> Self {
        let store = MemoryStore::new();
        let worker = store.add_worker(CreateWorker {
            name: "w".into(),
            owner_id: 1,
            models: vec!["A".into()],
            speed: 1.0,
            kudos_multiplier: 1.0,
        });
        let request = store.add_request(CreateRequest {
            owner_id: 2,
            kind: JobKind::Image,
            models: Vec::new(),
            things: 10.0,
            kudos: 1.0,
            n: 0,
        });
        Self {
            store,
            worker,
            request,
            now: Utc::now(),
        }
    }

    async fn job(&self, model: &str, minutes_old: i64, ttl_secs: i64) -> EntityId {
        let job = NewJob {
            id: Uuid::new_v4(),
            request_id: self.request.id,
            worker_id: self.worker.id,
            kind: JobKind::Image,
            model: model.into(),
            things: 10.0,
            fake: false,
            assigned_at: self.now - Duration::minutes(minutes_old),
            ttl_secs,
        };
        self.store.insert_job(&job).await.unwrap().id
    }

    async fn stuck(&self, model: &str, count: usize) {
        for _ in 0..count {
            self.job(model, 20, 86_400).await;
        }
    }
}

fn recording() -> (RecordingSink, Notifier, grid_events::DispatcherHandle) {
    let sink = RecordingSink::new();
    let (notifier, handle) = Dispatcher::spawn(Arc::new(sink.clone()), 32);
    (sink, notifier, handle)
}

#[tokio::test]
async fn six_stuck_jobs_alert_once_and_signal_threshold() {
    let q = Queue::new();
    q.stuck("A", 4).await;
    q.stuck("B", 2).await;
    let (sink, notifier, handle) = recording();

    let outcome = run_sweep(&q.store, &q.store, &notifier, &SweepOptions::default(), q.now)
        .await
        .unwrap();
    handle.shutdown().await;

    assert_eq!(outcome.stuck_count, 6);
    assert_eq!(outcome.health, QueueHealth::Unhealthy);
    assert!(outcome.alert_sent);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(outcome.stuck_by_model[0].model, "A");
    assert!(outcome.oldest_minutes >= 20.0);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, TITLE_STUCK_JOBS);
    assert_eq!(events[0].field("Total"), Some("6"));
}

#[tokio::test]
async fn below_threshold_is_quiet() {
    let q = Queue::new();
    q.stuck("A", 4).await;
    let (sink, notifier, handle) = recording();

    let outcome = run_sweep(&q.store, &q.store, &notifier, &SweepOptions::default(), q.now)
        .await
        .unwrap();
    handle.shutdown().await;

    assert_eq!(outcome.stuck_count, 4);
    assert_eq!(outcome.exit_code(), 0);
    assert!(!outcome.alert_sent);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn recent_jobs_are_not_stuck() {
    let q = Queue::new();
    for _ in 0..8 {
        q.job("A", 2, 86_400).await;
    }

    let outcome = run_sweep(&q.store, &q.store, &Notifier::disabled(), &SweepOptions::default(), q.now)
        .await
        .unwrap();
    assert_eq!(outcome.stuck_count, 0);
    assert_eq!(outcome.stats.processing_count, 8);
    assert_eq!(outcome.health, QueueHealth::Warning);
    assert!(outcome.summary(true).is_empty());
    assert!(!outcome.summary(false).is_empty());
}

#[tokio::test]
async fn no_alert_still_signals_threshold() {
    let q = Queue::new();
    q.stuck("A", 5).await;
    let (sink, notifier, handle) = recording();
    let options = SweepOptions {
        alerts: false,
        ..SweepOptions::default()
    };

    let outcome = run_sweep(&q.store, &q.store, &notifier, &options, q.now)
        .await
        .unwrap();
    handle.shutdown().await;

    assert_eq!(outcome.exit_code(), 1);
    assert!(!outcome.alert_sent);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn cleanup_removes_old_jobs_and_orphaned_requests() {
    let q = Queue::new();
    for _ in 0..3 {
        q.job("A", 45, 86_400).await;
    }
    q.stuck("A", 2).await;
    let (sink, notifier, handle) = recording();
    let options = SweepOptions {
        cleanup: true,
        alert_threshold: 100,
        ..SweepOptions::default()
    };

    let outcome = run_sweep(&q.store, &q.store, &notifier, &options, q.now)
        .await
        .unwrap();
    handle.shutdown().await;

    assert_eq!(outcome.cleaned, Some((3, 0)));
    assert_eq!(q.store.job_count(), 2);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, TITLE_QUEUE_CLEANED);
    assert_eq!(events[0].field("Jobs deleted"), Some("3"));
}

#[tokio::test]
async fn cleanup_deletes_request_once_its_jobs_are_gone() {
    let q = Queue::new();
    for _ in 0..2 {
        q.job("A", 45, 86_400).await;
    }
    let options = SweepOptions {
        cleanup: true,
        ..SweepOptions::default()
    };

    let outcome = run_sweep(&q.store, &q.store, &Notifier::disabled(), &options, q.now)
        .await
        .unwrap();
    assert_eq!(outcome.cleaned, Some((2, 1)));
    assert_eq!(q.store.request_count(), 0);
}

#[tokio::test]
async fn cleanup_skipped_when_nothing_is_stuck() {
    let q = Queue::new();
    q.job("A", 1, 86_400).await;
    let options = SweepOptions {
        cleanup: true,
        ..SweepOptions::default()
    };

    let outcome = run_sweep(&q.store, &q.store, &Notifier::disabled(), &options, q.now)
        .await
        .unwrap();
    assert_eq!(outcome.cleaned, None);
    assert_eq!(q.store.job_count(), 1);
}

#[tokio::test]
async fn abort_stale_goes_through_the_abort_path() {
    let q = Queue::new();
    let expired = q.job("A", 20, 60).await;
    let alive = q.job("A", 20, 86_400).await;
    let (sink, notifier, handle) = recording();
    let options = SweepOptions {
        abort_stale: true,
        ..SweepOptions::default()
    };

    let outcome = run_sweep(&q.store, &q.store, &notifier, &options, q.now)
        .await
        .unwrap();
    handle.shutdown().await;

    assert_eq!(outcome.aborted, 1);
    assert!(q.store.find_job(expired).await.unwrap().unwrap().faulted);
    assert!(!q.store.find_job(alive).await.unwrap().unwrap().faulted);
    assert_eq!(
        q.store.find_worker(q.worker.id).await.unwrap().unwrap().aborted_jobs,
        1
    );
    assert_eq!(sink.titled(TITLE_JOB_ABORTED).len(), 1);
}

#[tokio::test]
async fn repeated_sweeps_agree() {
    let q = Queue::new();
    q.stuck("A", 3).await;
    q.stuck("B", 3).await;
    let notifier = Notifier::disabled();

    let first = run_sweep(&q.store, &q.store, &notifier, &SweepOptions::default(), q.now)
        .await
        .unwrap();
    let second = run_sweep(&q.store, &q.store, &notifier, &SweepOptions::default(), q.now)
        .await
        .unwrap();

    assert_eq!(first.stuck_count, second.stuck_count);
    assert_eq!(first.stuck_by_model.len(), second.stuck_by_model.len());
    assert_eq!(first.stats, second.stats);
}
