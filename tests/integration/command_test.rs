//! Integration tests for chat commands.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use jobhound_cache::keys;
use jobhound_core::traits::cache::CacheProvider;
use jobhound_database::store::{PreferenceStore, UserStore};
use jobhound_entity::job::{DeliveryTask, JobStatus, queues};
use jobhound_service::{DeliveryQueue, Intent};
use jobhound_sources::SourceAdapter;

use helpers::{StaticSource, TestApp};

async fn keywords_of(app: &TestApp, chat: &str) -> Vec<String> {
    let user = app.user(chat).await;
    app.stores
        .preferences
        .list_for_user(user.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.keyword)
        .collect()
}

fn last_reply(app: &TestApp, chat: &str) -> String {
    app.transport
        .messages_to(chat)
        .pop()
        .unwrap_or_default()
}

#[tokio::test]
async fn test_start_registers_active_user() {
    let app = TestApp::new(vec![]);

    let intent = app.commands.handle("42", "/start").await.unwrap();

    assert_eq!(intent, Some(Intent::Subscribe));
    assert!(app.user("42").await.active);
    assert!(last_reply(&app, "42").starts_with("🎉 Welcome"));
}

#[tokio::test]
async fn test_set_adds_keywords_and_reports_duplicates() {
    let app = TestApp::new(vec![]);
    app.commands.handle("42", "/start").await.unwrap();

    app.commands.handle("42", "/set React, python").await.unwrap();
    assert_eq!(keywords_of(&app, "42").await, vec!["react", "python"]);
    assert!(last_reply(&app, "42").contains("✅ Added: react, python"));

    app.commands.handle("42", "/set react go").await.unwrap();
    let reply = last_reply(&app, "42");
    assert!(reply.contains("✅ Added: go"));
    assert!(reply.contains("ℹ️ Already tracking: react"));
    assert_eq!(keywords_of(&app, "42").await.len(), 3);
}

#[tokio::test]
async fn test_set_without_keywords_shows_usage() {
    let app = TestApp::new(vec![]);

    let intent = app.commands.handle("42", "/set").await.unwrap();

    assert_eq!(intent, Some(Intent::SetKeywords(vec![])));
    assert!(last_reply(&app, "42").contains("Usage: /set react python"));
    assert!(app.stores.users.find_by_external_id("42").await.unwrap().is_none());
}

#[tokio::test]
async fn test_bare_text_is_treated_as_keywords() {
    let app = TestApp::new(vec![]);

    app.commands.handle("42", "  Rust ").await.unwrap();

    assert!(app.user("42").await.active);
    assert_eq!(keywords_of(&app, "42").await, vec!["rust"]);
}

#[tokio::test]
async fn test_preferences_lists_keywords() {
    let app = TestApp::new(vec![]);
    app.commands.handle("42", "/preferences").await.unwrap();
    assert!(last_reply(&app, "42").starts_with("You don't have any preferences"));

    app.subscriber("42", &["go", "rust"]).await;
    app.commands.handle("42", "/preferences").await.unwrap();
    assert!(last_reply(&app, "42").contains("📋 Your job preferences:\ngo, rust"));
}

#[tokio::test]
async fn test_clear_removes_keywords_and_cancels_queued_deliveries() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("42", &["go"]).await;
    let other = app.subscriber("43", &["go"]).await;
    for recipient in [user.id, other.id] {
        app.queue
            .enqueue_delivery(DeliveryTask {
                posting_id: uuid::Uuid::new_v4(),
                keyword: "go".into(),
                is_manual_scan: false,
                triggering_user_id: None,
                recipient_id: Some(recipient),
            })
            .await
            .unwrap();
    }

    app.commands.handle("42", "/clear").await.unwrap();

    assert!(keywords_of(&app, "42").await.is_empty());
    assert!(app.user("42").await.active);
    assert_eq!(last_reply(&app, "42"), "✅ All preferences cleared!");

    let jobs = app.queue.list(queues::DELIVERY).await.unwrap();
    let status_for = |id| {
        jobs.iter()
            .find(|j| j.payload_as::<DeliveryTask>().unwrap().recipient_id == Some(id))
            .unwrap()
            .status
    };
    assert_eq!(status_for(user.id), JobStatus::Cancelled);
    assert_eq!(status_for(other.id), JobStatus::Pending);
}

#[tokio::test]
async fn test_stop_deactivates_and_cancels() {
    let app = TestApp::new(vec![]);
    let user = app.subscriber("42", &["go"]).await;
    app.queue
        .enqueue_delivery(DeliveryTask {
            posting_id: uuid::Uuid::new_v4(),
            keyword: "go".into(),
            is_manual_scan: true,
            triggering_user_id: Some(user.id),
            recipient_id: None,
        })
        .await
        .unwrap();

    app.commands.handle("42", "/stop").await.unwrap();

    assert!(!app.user("42").await.active);
    // Preferences are kept for a later /start.
    assert_eq!(keywords_of(&app, "42").await, vec!["go"]);
    let jobs = app.queue.list(queues::DELIVERY).await.unwrap();
    assert_eq!(jobs[0].status, JobStatus::Cancelled);
    assert!(last_reply(&app, "42").starts_with("🛑"));
}

#[tokio::test]
async fn test_set_does_not_reactivate_a_stopped_user() {
    let app = TestApp::new(vec![]);
    app.subscriber("42", &["go"]).await;
    app.commands.handle("42", "/stop").await.unwrap();

    app.commands.handle("42", "rust").await.unwrap();

    assert!(!app.user("42").await.active);
    assert_eq!(keywords_of(&app, "42").await, vec!["go", "rust"]);

    app.commands.handle("42", "/start").await.unwrap();
    assert!(app.user("42").await.active);
}

#[tokio::test]
async fn test_scan_requires_preferences() {
    let source = StaticSource::new("RemoteOK").with("go", &["https://x/1"]);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    app.commands.handle("42", "/start").await.unwrap();

    app.commands.handle("42", "/scan").await.unwrap();

    assert!(last_reply(&app, "42").starts_with("⚠️ You have no scan preferences set!"));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_scan_enqueues_only_for_the_requester() {
    let source = StaticSource::new("RemoteOK")
        .with("go", &["https://x/go"])
        .with("python", &["https://x/py"]);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    let requester = app.subscriber("42", &["go"]).await;
    app.subscriber("43", &["python"]).await;

    let intent = app.commands.handle("42", "/scan").await.unwrap();
    assert_eq!(intent, Some(Intent::ManualScan));

    let replies = app.transport.messages_to("42");
    assert!(replies[replies.len() - 2].starts_with("🔍 Scanning..."));
    assert_eq!(
        replies[replies.len() - 1],
        "✅ Manual scan completed!\n\n📊 Checked 2 jobs, 2 new for you."
    );

    let jobs = app.queue.list(queues::DELIVERY).await.unwrap();
    assert_eq!(jobs.len(), 2);
    for job in &jobs {
        let task: DeliveryTask = job.payload_as().unwrap();
        assert_eq!(task.triggering_user_id, Some(requester.id));
    }

    // The guard is released once the scan returns.
    assert!(
        !app.cache
            .exists(&keys::manual_scan_guard(requester.id))
            .await
            .unwrap()
    );

    app.drain_deliveries().await;
    assert_eq!(app.transport.postings_to("42", "https://x/go"), 1);
    assert_eq!(app.transport.postings_to("42", "https://x/py"), 1);
    assert!(app.transport.messages_to("43").is_empty());
}

#[tokio::test]
async fn test_scan_after_stop_asks_to_start_again() {
    let source = StaticSource::new("RemoteOK").with("go", &["https://x/1"]);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    app.subscriber("42", &["go"]).await;
    app.commands.handle("42", "/stop").await.unwrap();

    app.commands.handle("42", "/scan").await.unwrap();

    assert!(last_reply(&app, "42").contains("/start"));
    assert_eq!(source.calls(), 0);
    assert!(app.queue.list(queues::DELIVERY).await.unwrap().is_empty());
    assert!(!app.user("42").await.active);

    // After /start the same scan goes through.
    app.commands.handle("42", "/start").await.unwrap();
    app.commands.handle("42", "/scan").await.unwrap();
    assert_eq!(source.calls(), 1);
    app.drain_deliveries().await;
    assert_eq!(app.transport.postings_to("42", "https://x/1"), 1);
}

#[tokio::test]
async fn test_scan_refused_while_previous_scan_runs() {
    let source = StaticSource::new("RemoteOK").with("go", &["https://x/1"]);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    let user = app.subscriber("42", &["go"]).await;
    app.cache
        .set(&keys::manual_scan_guard(user.id), "1", Duration::from_secs(60))
        .await
        .unwrap();

    app.commands.handle("42", "/scan").await.unwrap();

    assert!(last_reply(&app, "42").starts_with("⏳"));
    assert_eq!(source.calls(), 0);
}

#[tokio::test]
async fn test_scan_reports_partial_failures() {
    let source = StaticSource::new("RemoteOK");
    source.set_failing(true);
    let app = TestApp::new(vec![source.clone() as Arc<dyn SourceAdapter>]);
    app.subscriber("42", &["go"]).await;

    app.commands.handle("42", "/scan").await.unwrap();

    assert!(last_reply(&app, "42").contains("may be incomplete"));
}

#[tokio::test]
async fn test_unknown_commands_are_ignored() {
    let app = TestApp::new(vec![]);

    assert_eq!(app.commands.handle("42", "/help").await.unwrap(), None);
    assert_eq!(app.commands.handle("42", "   ").await.unwrap(), None);
    assert!(app.transport.sent().is_empty());
    assert!(app.stores.users.find_by_external_id("42").await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_reply_does_not_fail_the_command() {
    let app = TestApp::new(vec![]);
    app.transport.fail_for(
        "42",
        jobhound_core::traits::transport::SendError::Permanent("blocked".into()),
    );

    app.commands.handle("42", "/set go").await.unwrap();

    assert_eq!(keywords_of(&app, "42").await, vec!["go"]);
}
