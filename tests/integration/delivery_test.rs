//! Integration tests for planning, the delivery ledger, and the delivery
//! worker's handling of transport failures.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use jobhound_core::traits::transport::SendError;
use jobhound_database::store::{DeliveryLedger, JobStore, PostingStore, PreferenceStore, UserStore};
use jobhound_entity::job::{DeliveryTask, JobStatus, queues};
use jobhound_entity::posting::{NewPosting, Posting};
use jobhound_service::{DeliveryPlanner, DeliveryQueue, PlanContext};
use uuid::Uuid;

use helpers::{TestApp, kw};

async fn posting(app: &TestApp, link: &str, keyword: &str) -> Posting {
    let new = NewPosting {
        link: link.into(),
        title: "Backend Engineer".into(),
        company: Some("Acme".into()),
        description: Some("Ship things".into()),
        source: "RemoteOK".into(),
        keyword: keyword.into(),
    };
    app.stores.postings.upsert(&new).await.unwrap().0
}

fn planner(app: &TestApp) -> DeliveryPlanner {
    DeliveryPlanner::new(Arc::clone(&app.stores.users), Arc::clone(&app.stores.deliveries))
}

fn automatic_task(posting: &Posting, recipient: Option<Uuid>) -> DeliveryTask {
    DeliveryTask {
        posting_id: posting.id,
        keyword: posting.keyword.clone(),
        is_manual_scan: false,
        triggering_user_id: None,
        recipient_id: recipient,
    }
}

#[tokio::test]
async fn test_sequential_plan_and_deliver_records_once() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("100", &["go"]).await;
    let p = posting(&app, "https://x/1", "go").await;

    for _ in 0..3 {
        let targets = planner(&app)
            .plan(&p, &kw("go"), &PlanContext::automatic())
            .await
            .unwrap();
        for target in targets {
            app.notifications
                .deliver(&automatic_task(&p, Some(target.id)))
                .await
                .unwrap();
        }
    }

    assert_eq!(app.store.delivery_count(), 1);
    assert!(app.stores.deliveries.is_delivered(p.id, user.id).await.unwrap());
    assert_eq!(app.transport.postings_to("100", "https://x/1"), 1);
}

#[tokio::test]
async fn test_replayed_task_does_not_resend() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("100", &["go"]).await;
    let p = posting(&app, "https://x/1", "go").await;
    let task = automatic_task(&p, Some(user.id));

    let first = app.notifications.deliver(&task).await.unwrap();
    let second = app.notifications.deliver(&task).await.unwrap();

    assert_eq!(first.sent, 1);
    assert_eq!(second.sent, 0);
    assert_eq!(second.already_delivered, 1);
    assert_eq!(app.transport.sent().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_for_one_pair_send_once() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("100", &["go"]).await;
    let p = posting(&app, "https://x/1", "go").await;
    app.transport.set_delay(Duration::from_millis(20));

    let runs = (0..8).map(|_| {
        let notifications = app.notifications.clone();
        let task = automatic_task(&p, Some(user.id));
        tokio::spawn(async move { notifications.deliver(&task).await.unwrap() })
    });
    let outcomes: Vec<_> = join_all(runs).await.into_iter().map(|r| r.unwrap()).collect();

    let sent: usize = outcomes.iter().map(|o| o.sent).sum();
    assert_eq!(sent, 1);
    assert_eq!(app.transport.postings_to("100", "https://x/1"), 1);
    assert_eq!(app.store.delivery_count(), 1);
}

#[tokio::test]
async fn test_permanent_failure_deactivates_and_excludes_user() {
    let app = TestApp::new(vec![]);
    let blocked = app.subscriber("200", &["rust"]).await;
    let other = app.subscriber("201", &["rust"]).await;
    app.transport
        .fail_for("200", SendError::Permanent("bot was blocked by the user".into()));
    let p = posting(&app, "https://x/r1", "rust").await;

    let outcome = app
        .notifications
        .deliver(&automatic_task(&p, None))
        .await
        .unwrap();

    assert_eq!(outcome.deactivated, 1);
    assert_eq!(outcome.sent, 1);
    assert!(!app.user("200").await.active);
    assert!(!app.stores.deliveries.is_delivered(p.id, blocked.id).await.unwrap());

    let next = posting(&app, "https://x/r2", "rust").await;
    let targets = planner(&app)
        .plan(&next, &kw("rust"), &PlanContext::automatic())
        .await
        .unwrap();
    assert_eq!(targets.iter().map(|u| u.id).collect::<Vec<_>>(), vec![other.id]);
}

#[tokio::test]
async fn test_transient_failure_skips_recipient_without_recording() {
    let app = TestApp::new(vec![]);
    let flaky = app.subscriber("300", &["go"]).await;
    app.subscriber("301", &["go"]).await;
    app.transport
        .fail_for("300", SendError::Transient("message is too long".into()));
    let p = posting(&app, "https://x/1", "go").await;

    let outcome = app
        .notifications
        .deliver(&automatic_task(&p, None))
        .await
        .unwrap();

    assert_eq!(outcome.failed, 1);
    assert_eq!(outcome.sent, 1);
    assert!(app.user("300").await.active);
    assert!(!app.stores.deliveries.is_delivered(p.id, flaky.id).await.unwrap());

    // The next pass re-surfaces the posting to the skipped user only.
    app.transport.heal("300");
    let targets = planner(&app)
        .plan(&p, &kw("go"), &PlanContext::automatic())
        .await
        .unwrap();
    assert_eq!(targets.iter().map(|u| u.id).collect::<Vec<_>>(), vec![flaky.id]);
}

#[tokio::test]
async fn test_transport_outage_fails_the_job_for_retry() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("400", &["go"]).await;
    app.transport
        .fail_for("400", SendError::Unavailable("502 Bad Gateway".into()));
    let p = posting(&app, "https://x/1", "go").await;

    assert!(app.notifications.deliver(&automatic_task(&p, Some(user.id))).await.is_err());

    app.queue
        .enqueue_delivery(automatic_task(&p, Some(user.id)))
        .await
        .unwrap();
    assert!(app.delivery_worker.run_next().await.unwrap());

    let job = app.queue.list(queues::DELIVERY).await.unwrap().remove(0);
    assert_eq!(job.status, JobStatus::Pending);
    assert_eq!(job.attempts, 1);

    app.transport.heal("400");
    app.drain_deliveries().await;

    let job = app.stores.jobs.find_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(app.transport.postings_to("400", "https://x/1"), 1);
}

#[tokio::test]
async fn test_retries_exhausted_marks_job_failed() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("400", &["go"]).await;
    app.transport
        .fail_for("400", SendError::Unavailable("connection reset".into()));
    let p = posting(&app, "https://x/1", "go").await;

    app.queue
        .enqueue_delivery(automatic_task(&p, Some(user.id)))
        .await
        .unwrap();
    let runs = app.drain_deliveries().await;

    let job = app.queue.list(queues::DELIVERY).await.unwrap().remove(0);
    assert_eq!(runs, 3);
    assert_eq!(job.status, JobStatus::Failed);
    assert_eq!(job.attempts, 3);
    assert!(job.error_message.unwrap().contains("unavailable"));
}

#[tokio::test]
async fn test_missing_posting_is_acknowledged() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("500", &["go"]).await;
    let task = DeliveryTask {
        posting_id: Uuid::new_v4(),
        keyword: "go".into(),
        is_manual_scan: false,
        triggering_user_id: None,
        recipient_id: Some(user.id),
    };

    let outcome = app.notifications.deliver(&task).await.unwrap();
    assert!(outcome.posting_missing);

    app.queue.enqueue_delivery(task).await.unwrap();
    app.drain_deliveries().await;
    let job = app.queue.list(queues::DELIVERY).await.unwrap().remove(0);
    assert_eq!(job.status, JobStatus::Completed);
    assert!(app.transport.sent().is_empty());
}

#[tokio::test]
async fn test_recipients_are_resolved_at_send_time() {
    let app = TestApp::new(vec![]);
    let stays = app.subscriber("600", &["go"]).await;
    let leaves = app.subscriber("601", &["go"]).await;
    let p = posting(&app, "https://x/1", "go").await;

    app.queue
        .enqueue_delivery(automatic_task(&p, Some(stays.id)))
        .await
        .unwrap();
    app.queue
        .enqueue_delivery(automatic_task(&p, Some(leaves.id)))
        .await
        .unwrap();

    // Preferences change between enqueue and send.
    app.stores.preferences.clear(leaves.id).await.unwrap();
    app.drain_deliveries().await;

    assert_eq!(app.transport.postings_to("600", "https://x/1"), 1);
    assert!(app.transport.messages_to("601").is_empty());
    assert!(!app.stores.deliveries.is_delivered(p.id, leaves.id).await.unwrap());
}

#[tokio::test]
async fn test_deactivated_recipient_is_skipped_at_send_time() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("700", &["go"]).await;
    let p = posting(&app, "https://x/1", "go").await;

    app.stores.users.set_active(user.id, false).await.unwrap();
    let outcome = app
        .notifications
        .deliver(&automatic_task(&p, Some(user.id)))
        .await
        .unwrap();

    assert_eq!(outcome.sent, 0);
    assert!(app.transport.sent().is_empty());
}

#[tokio::test]
async fn test_manual_delivery_skips_requester_who_stopped() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("750", &["go"]).await;
    let p = posting(&app, "https://x/1", "go").await;

    app.stores.users.set_active(user.id, false).await.unwrap();
    let outcome = app
        .notifications
        .deliver(&DeliveryTask {
            posting_id: p.id,
            keyword: "go".into(),
            is_manual_scan: true,
            triggering_user_id: Some(user.id),
            recipient_id: None,
        })
        .await
        .unwrap();

    assert_eq!(outcome.sent, 0);
    assert!(app.transport.sent().is_empty());
    assert!(!app.stores.deliveries.is_delivered(p.id, user.id).await.unwrap());
}

#[tokio::test]
async fn test_message_carries_banner_and_link() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("800", &["go"]).await;
    let p = posting(&app, "https://x/1", "go").await;

    let manual = DeliveryTask {
        posting_id: p.id,
        keyword: "go".into(),
        is_manual_scan: true,
        triggering_user_id: Some(user.id),
        recipient_id: None,
    };
    app.notifications.deliver(&manual).await.unwrap();

    let messages = app.transport.messages_to("800");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].starts_with("🔍 Manual Scan"));
    assert!(messages[0].contains("*Backend Engineer*"));
    assert!(messages[0].contains("⏰ Posted: just now"));
    assert!(messages[0].ends_with("[Apply Here](https://x/1)"));
}
