//! Integration tests for background jobs: scan passes, idle notices,
//! housekeeping and the scan tick.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use jobhound_cache::keys;
use jobhound_core::traits::cache::CacheProvider;
use jobhound_core::traits::transport::SendError;
use jobhound_database::store::{JobStore, PostingStore};
use jobhound_entity::job::{HousekeepingTask, JobStatus, ScanTask, job_types, queues};
use jobhound_service::format::idle_message;
use jobhound_sources::SourceAdapter;
use jobhound_worker::scheduler::enqueue_scan_tick;

use helpers::{StaticSource, TestApp, raw};

/// Source that, mid-fetch, lets the scan lock lapse and hands it to another
/// process.
#[derive(Debug)]
struct LockTakeover {
    cache: Arc<dyn CacheProvider>,
}

#[async_trait::async_trait]
impl SourceAdapter for LockTakeover {
    fn name(&self) -> &str {
        "Takeover"
    }

    async fn fetch(
        &self,
        _keyword: &jobhound_core::Keyword,
    ) -> jobhound_core::AppResult<Vec<jobhound_entity::posting::RawPosting>> {
        self.cache.delete(&keys::scan_lock()).await?;
        self.cache
            .set(&keys::scan_lock(), "other-process", Duration::from_secs(60))
            .await?;
        Ok(vec![])
    }
}

#[tokio::test]
async fn test_scan_job_fans_out_deliveries() {
    let source = StaticSource::new("RemoteOK").with("go", &["https://x/1", "https://x/2"]);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    app.subscriber("a", &["go"]).await;
    app.subscriber("b", &["go"]).await;

    let job = app.queue.enqueue_scan(&ScanTask::default()).await.unwrap();
    assert!(app.scan_worker.run_next().await.unwrap());

    let job = app.stores.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    let result = job.result.unwrap();
    assert_eq!(result["new_postings"], 2);
    assert_eq!(result["enqueued"], 4);

    // The lock is released after the pass.
    assert!(!app.cache.exists(&keys::scan_lock()).await.unwrap());

    assert_eq!(app.drain_deliveries().await, 4);
    for chat in ["a", "b"] {
        assert_eq!(app.transport.postings_to(chat, "https://x/1"), 1);
        assert_eq!(app.transport.postings_to(chat, "https://x/2"), 1);
    }
}

#[tokio::test]
async fn test_scan_job_skips_while_lock_is_held() {
    let source = StaticSource::new("RemoteOK").with("go", &["https://x/1"]);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    app.subscriber("a", &["go"]).await;
    app.cache
        .set(&keys::scan_lock(), "other-process", Duration::from_secs(60))
        .await
        .unwrap();

    let job = app.queue.enqueue_scan(&ScanTask::default()).await.unwrap();
    app.scan_worker.drain().await.unwrap();

    let job = app.stores.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert!(job.result.unwrap().get("skipped").is_some());
    assert_eq!(source.calls(), 0);
    assert_eq!(app.cache.get(&keys::scan_lock()).await.unwrap().as_deref(), Some("other-process"));
}

#[tokio::test]
async fn test_scan_release_keeps_lock_taken_over_by_another_holder() {
    let cache: Arc<dyn CacheProvider> = Arc::new(
        jobhound_cache::memory::MemoryCacheProvider::new(
            &jobhound_core::config::cache::MemoryCacheConfig::default(),
        ),
    );
    let takeover = Arc::new(LockTakeover {
        cache: Arc::clone(&cache),
    });
    let app = TestApp::with_cache(vec![takeover as Arc<dyn SourceAdapter>], Arc::clone(&cache));
    app.subscriber("a", &["go"]).await;

    let job = app.queue.enqueue_scan(&ScanTask::default()).await.unwrap();
    app.scan_worker.drain().await.unwrap();

    let job = app.stores.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(
        app.cache.get(&keys::scan_lock()).await.unwrap().as_deref(),
        Some("other-process")
    );
}

#[tokio::test]
async fn test_scan_job_honours_site_hint() {
    let remoteok = StaticSource::new("RemoteOK").with("go", &["https://x/1"]);
    let remotive = StaticSource::new("Remotive").with("go", &["https://x/2"]);
    let app = TestApp::new(vec![
        remoteok.clone() as Arc<dyn SourceAdapter>,
        remotive.clone() as Arc<dyn SourceAdapter>,
    ]);
    app.subscriber("a", &["go"]).await;

    app.queue
        .enqueue_scan(&ScanTask {
            site_hint: Some("RemoteOK".into()),
        })
        .await
        .unwrap();
    app.scan_worker.drain().await.unwrap();

    assert_eq!(remoteok.calls(), 1);
    assert_eq!(remotive.calls(), 0);
}

#[tokio::test]
async fn test_empty_pass_sends_idle_notice_once_per_window() {
    let source = StaticSource::new("RemoteOK").with("go", &["https://x/1"]);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    app.subscriber("a", &["go"]).await;
    app.subscriber("idle", &[]).await;

    // First pass finds a new posting: no idle notice.
    app.queue.enqueue_scan(&ScanTask::default()).await.unwrap();
    app.scan_worker.drain().await.unwrap();
    assert!(!app.transport.messages_to("a").contains(&idle_message()));

    // Two empty passes: one notice within the window.
    for _ in 0..2 {
        app.queue.enqueue_scan(&ScanTask::default()).await.unwrap();
        app.scan_worker.drain().await.unwrap();
    }
    let notices = app
        .transport
        .messages_to("a")
        .into_iter()
        .filter(|m| *m == idle_message())
        .count();
    assert_eq!(notices, 1);

    // Users without preferences never get one.
    assert!(app.transport.messages_to("idle").is_empty());
}

#[tokio::test]
async fn test_idle_notice_failure_is_retried_on_next_empty_pass() {
    let source = StaticSource::new("RemoteOK");
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    let user = app.subscriber("a", &["go"]).await;
    app.transport
        .fail_for("a", SendError::Transient("flood wait".into()));

    app.queue.enqueue_scan(&ScanTask::default()).await.unwrap();
    app.scan_worker.drain().await.unwrap();
    assert!(!app.cache.exists(&keys::idle_notice(user.id)).await.unwrap());

    app.transport.heal("a");
    app.queue.enqueue_scan(&ScanTask::default()).await.unwrap();
    app.scan_worker.drain().await.unwrap();
    assert_eq!(app.transport.messages_to("a"), vec![idle_message()]);
}

#[tokio::test]
async fn test_idle_notice_permanent_failure_deactivates() {
    let source = StaticSource::new("RemoteOK");
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    app.subscriber("a", &["go"]).await;
    app.transport
        .fail_for("a", SendError::Permanent("chat not found".into()));

    app.queue.enqueue_scan(&ScanTask::default()).await.unwrap();
    app.scan_worker.drain().await.unwrap();

    assert!(!app.user("a").await.active);
}

#[tokio::test]
async fn test_scan_tick_skips_when_scan_pending() {
    let app = TestApp::new(vec![]);

    assert!(enqueue_scan_tick(&app.queue).await.unwrap());
    assert!(!enqueue_scan_tick(&app.queue).await.unwrap());
    assert_eq!(app.queue.list(queues::SCAN).await.unwrap().len(), 1);

    app.scan_worker.drain().await.unwrap();
    assert!(enqueue_scan_tick(&app.queue).await.unwrap());
}

#[tokio::test]
async fn test_scan_orphaned_by_crash_does_not_block_later_ticks() {
    let source = StaticSource::new("RemoteOK").with("go", &["https://x/1"]);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    app.subscriber("a", &["go"]).await;

    assert!(enqueue_scan_tick(&app.queue).await.unwrap());
    // A worker claims the pass and dies before settling it.
    let orphan = app.queue.dequeue(queues::SCAN, "dead-worker").await.unwrap().unwrap();
    app.store
        .backdate_job_start(orphan.id, Utc::now() - chrono::Duration::hours(1));

    for _ in 0..3 {
        enqueue_scan_tick(&app.queue).await.unwrap();
    }
    assert_eq!(app.queue.list(queues::SCAN).await.unwrap().len(), 1);

    assert_eq!(app.scan_worker.drain().await.unwrap(), 1);
    let job = app.stores.jobs.find_by_id(orphan.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.attempts, 2);
    assert_eq!(source.calls(), 1);

    // Scheduling is back to normal.
    assert!(enqueue_scan_tick(&app.queue).await.unwrap());
}

#[tokio::test]
async fn test_runner_fails_orphan_on_its_last_attempt() {
    let app = TestApp::new(vec![]);
    let job = app
        .queue
        .enqueue_housekeeping(&HousekeepingTask::default())
        .await
        .unwrap();
    assert_eq!(job.max_attempts, 1);
    app.queue.dequeue(queues::MAINTENANCE, "dead-worker").await.unwrap().unwrap();
    app.store
        .backdate_job_start(job.id, Utc::now() - chrono::Duration::hours(1));

    assert_eq!(app.maintenance_worker.reclaim().await.unwrap(), 1);
    let job = app.stores.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().contains("dead-worker"));
    assert_eq!(app.maintenance_worker.drain().await.unwrap(), 0);
}

#[tokio::test]
async fn test_housekeeping_removes_expired_postings_and_their_deliveries() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("a", &["go"]).await;
    let engine = jobhound_service::IngestionEngine::new(Arc::clone(&app.stores.postings));
    let report = engine
        .ingest(
            "RemoteOK",
            &helpers::kw("go"),
            &[raw("RemoteOK", "https://x/old"), raw("RemoteOK", "https://x/new")],
            20,
        )
        .await;
    let old = report.accepted[0].posting.clone();

    app.notifications
        .deliver(&jobhound_entity::job::DeliveryTask {
            posting_id: old.id,
            keyword: "go".into(),
            is_manual_scan: false,
            triggering_user_id: None,
            recipient_id: Some(user.id),
        })
        .await
        .unwrap();
    assert_eq!(app.store.delivery_count(), 1);

    app.store
        .backdate_posting(old.id, Utc::now() - chrono::Duration::days(45));

    let job = app
        .queue
        .enqueue_housekeeping(&HousekeepingTask::default())
        .await
        .unwrap();
    assert_eq!(job.job_type, job_types::HOUSEKEEPING);
    app.maintenance_worker.drain().await.unwrap();

    let job = app.stores.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(job.result.unwrap()["postings_removed"], 1);
    assert!(app.stores.postings.find_by_link("https://x/old").await.unwrap().is_none());
    assert!(app.stores.postings.find_by_link("https://x/new").await.unwrap().is_some());
    assert_eq!(app.store.delivery_count(), 0);
}

#[tokio::test]
async fn test_invalid_housekeeping_retention_fails_without_retry() {
    let app = TestApp::new(vec![]);

    let job = app
        .queue
        .enqueue_housekeeping(&HousekeepingTask {
            retention_days: Some(0),
        })
        .await
        .unwrap();
    assert_eq!(app.maintenance_worker.drain().await.unwrap(), 1);

    let job = app.stores.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error_message.unwrap().contains("Retention must be positive"));
}

#[tokio::test]
async fn test_unknown_job_type_fails_permanently() {
    let app = TestApp::new(vec![]);

    let job = app
        .queue
        .enqueue(jobhound_entity::job::CreateJob {
            job_type: "reindex".into(),
            queue: queues::MAINTENANCE.into(),
            priority: jobhound_entity::job::JobPriority::Normal,
            payload: serde_json::json!({}),
            max_attempts: 3,
            scheduled_at: None,
        })
        .await
        .unwrap();
    assert_eq!(app.maintenance_worker.drain().await.unwrap(), 1);

    let job = app.stores.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 1);
}
