//! Integration tests for ingestion and link-keyed deduplication.

mod helpers;

use std::sync::Arc;

use futures::future::join_all;

use jobhound_core::types::keyword::split_keywords;
use jobhound_database::store::{PostingStore, UserStore};
use jobhound_service::{IngestionEngine, PlanContext};

use helpers::{TestApp, kw, raw};

#[tokio::test]
async fn test_same_link_ingested_repeatedly_is_one_row() {
    let app = TestApp::new(vec![]);
    let engine = IngestionEngine::new(Arc::clone(&app.stores.postings));
    let batch = vec![raw("RemoteOK", "https://x/1")];

    for _ in 0..5 {
        engine.ingest("RemoteOK", &kw("go"), &batch, 20).await;
    }

    assert_eq!(app.stores.postings.count_by_link("https://x/1").await.unwrap(), 1);
    assert_eq!(app.store.posting_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_ingestion_of_same_link_is_one_row() {
    let app = TestApp::new(vec![]);
    let engine = IngestionEngine::new(Arc::clone(&app.stores.postings));

    let runs = (0..16).map(|i| {
        let engine = engine.clone();
        let source = if i % 2 == 0 { "RemoteOK" } else { "Remotive" };
        let keyword = if i % 3 == 0 { "go" } else { "rust" };
        tokio::spawn(async move {
            engine
                .ingest(source, &kw(keyword), &[raw(source, "https://x/1")], 20)
                .await
        })
    });
    let reports: Vec<_> = join_all(runs)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(app.stores.postings.count_by_link("https://x/1").await.unwrap(), 1);
    let created: usize = reports.iter().map(|r| r.created_count()).sum();
    assert_eq!(created, 1);

    let id = reports[0].accepted[0].posting.id;
    assert!(reports.iter().all(|r| r.accepted[0].posting.id == id));
}

#[tokio::test]
async fn test_cap_applies_per_call() {
    let app = TestApp::new(vec![]);
    let engine = IngestionEngine::new(Arc::clone(&app.stores.postings));
    let batch: Vec<_> = (0..30)
        .map(|i| raw("RemoteOK", &format!("https://x/{i}")))
        .collect();

    let report = engine.ingest("RemoteOK", &kw("go"), &batch, 20).await;

    assert_eq!(report.accepted.len(), 20);
    assert_eq!(app.store.posting_count(), 20);
    assert!(
        app.stores
            .postings
            .find_by_link("https://x/25")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_known_postings_are_still_returned_for_planning() {
    let app = TestApp::new(vec![]);
    let engine = IngestionEngine::new(Arc::clone(&app.stores.postings));
    let batch = vec![raw("RemoteOK", "https://x/1"), raw("RemoteOK", "https://x/2")];

    engine.ingest("RemoteOK", &kw("go"), &batch[..1], 20).await;
    let second = engine.ingest("RemoteOK", &kw("go"), &batch, 20).await;

    assert_eq!(second.accepted.len(), 2);
    assert_eq!(second.created_count(), 1);
}

#[tokio::test]
async fn test_react_with_trailing_space_matches_react() {
    let app = TestApp::new(vec![]);
    let a = app.subscriber("a", &["React "]).await;
    let b = app.subscriber("b", &["react"]).await;

    // Both spellings collapse onto one keyword.
    assert_eq!(kw("React "), kw("react"));
    assert_eq!(split_keywords("React , react"), vec![kw("react")]);

    let holders = app
        .stores
        .users
        .find_active_by_keyword(&kw("REACT"))
        .await
        .unwrap();
    let mut ids: Vec<_> = holders.iter().map(|u| u.id).collect();
    ids.sort();
    let mut expected = vec![a.id, b.id];
    expected.sort();
    assert_eq!(ids, expected);

    let engine = IngestionEngine::new(Arc::clone(&app.stores.postings));
    let report = engine
        .ingest("RemoteOK", &kw("react "), &[raw("RemoteOK", "https://x/r")], 20)
        .await;
    let posting = &report.accepted[0].posting;
    assert_eq!(posting.keyword, "react");

    let planner = jobhound_service::DeliveryPlanner::new(
        Arc::clone(&app.stores.users),
        Arc::clone(&app.stores.deliveries),
    );
    let targets = planner
        .plan(posting, &kw("React"), &PlanContext::automatic())
        .await
        .unwrap();
    assert_eq!(targets.len(), 2);
}
