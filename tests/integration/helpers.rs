//! Shared test helpers for integration tests.
//!
//! Everything runs against the in-memory store and cache, a transport that
//! records what it was asked to send, and sources that return canned
//! postings.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use jobhound_cache::memory::MemoryCacheProvider;
use jobhound_core::config::AppConfig;
use jobhound_core::config::cache::MemoryCacheConfig;
use jobhound_core::traits::cache::CacheProvider;
use jobhound_core::traits::transport::{MessageTransport, SendError};
use jobhound_core::{AppError, AppResult, Keyword};
use jobhound_database::store::{PreferenceStore, UserStore};
use jobhound_database::{MemoryStore, Stores};
use jobhound_entity::job::queues;
use jobhound_entity::posting::RawPosting;
use jobhound_entity::user::User;
use jobhound_service::{
    CommandService, DeliveryPlanner, DeliveryQueue, IdleNotifier, IngestionEngine,
    NotificationService, ScanOrchestrator,
};
use jobhound_sources::SourceAdapter;
use jobhound_worker::jobs::{DeliveryJobHandler, HousekeepingJobHandler, ScanJobHandler};
use jobhound_worker::{JobExecutor, JobQueue, WorkerRunner};

/// Transport that records sends and fails on demand per recipient.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    failures: Mutex<HashMap<String, SendError>>,
    delay: Mutex<Option<Duration>>,
}

impl RecordingTransport {
    /// Make every send to `recipient` fail with `err`.
    pub fn fail_for(&self, recipient: &str, err: SendError) {
        self.failures
            .lock()
            .unwrap()
            .insert(recipient.to_string(), err);
    }

    /// Stop failing sends to `recipient`.
    pub fn heal(&self, recipient: &str) {
        self.failures.lock().unwrap().remove(recipient);
    }

    /// Sleep this long inside every send.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Everything sent, in order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages sent to `recipient`.
    pub fn messages_to(&self, recipient: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, text)| text)
            .collect()
    }

    /// Messages to `recipient` that announce a posting with `link`.
    pub fn postings_to(&self, recipient: &str, link: &str) -> usize {
        self.messages_to(recipient)
            .iter()
            .filter(|m| m.contains(&format!("({link})")))
            .count()
    }

    /// Drop the recorded history.
    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }
}

#[async_trait]
impl MessageTransport for RecordingTransport {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), SendError> {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().unwrap().get(recipient).cloned() {
            return Err(err);
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), message.to_string()));
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Source returning fixed postings per keyword.
pub struct StaticSource {
    name: String,
    postings: Mutex<HashMap<String, Vec<RawPosting>>>,
    failing: Mutex<bool>,
    calls: AtomicUsize,
}

impl StaticSource {
    /// An empty source called `name`.
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            postings: Mutex::new(HashMap::new()),
            failing: Mutex::new(false),
            calls: AtomicUsize::new(0),
        })
    }

    /// Return `links` (titled after the link) for `keyword`.
    pub fn with(self: Arc<Self>, keyword: &str, links: &[&str]) -> Arc<Self> {
        let items = links.iter().map(|link| raw(&self.name, link)).collect();
        self.postings
            .lock()
            .unwrap()
            .insert(keyword.to_string(), items);
        self
    }

    /// Make every fetch fail.
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// Number of fetches so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, keyword: &Keyword) -> AppResult<Vec<RawPosting>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.failing.lock().unwrap() {
            return Err(AppError::external(format!("{} is down", self.name)));
        }
        Ok(self
            .postings
            .lock()
            .unwrap()
            .get(keyword.as_str())
            .cloned()
            .unwrap_or_default())
    }
}

/// A raw posting whose title is derived from its link.
pub fn raw(source: &str, link: &str) -> RawPosting {
    RawPosting {
        title: format!("Job {link}"),
        link: link.to_string(),
        company: Some("Acme".to_string()),
        description: Some("Remote role".to_string()),
        source: source.to_string(),
    }
}

/// Parse a keyword in tests.
pub fn kw(text: &str) -> Keyword {
    Keyword::parse(text).unwrap()
}

/// Fully wired pipeline over in-memory collaborators.
pub struct TestApp {
    pub config: AppConfig,
    pub store: MemoryStore,
    pub stores: Stores,
    pub cache: Arc<dyn CacheProvider>,
    pub transport: Arc<RecordingTransport>,
    pub queue: JobQueue,
    pub orchestrator: ScanOrchestrator,
    pub notifications: NotificationService,
    pub commands: CommandService,
    pub delivery_worker: WorkerRunner,
    pub scan_worker: WorkerRunner,
    pub maintenance_worker: WorkerRunner,
}

impl TestApp {
    /// Wire the pipeline over `sources`.
    pub fn new(sources: Vec<Arc<dyn SourceAdapter>>) -> Self {
        let cache: Arc<dyn CacheProvider> =
            Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default()));
        Self::with_cache(sources, cache)
    }

    /// Wire the pipeline over `sources`, sharing `cache` with the caller.
    pub fn with_cache(sources: Vec<Arc<dyn SourceAdapter>>, cache: Arc<dyn CacheProvider>) -> Self {
        let mut config = AppConfig::default();
        config.worker.retry_backoff_seconds = 0;

        let store = MemoryStore::new();
        let stores = Stores::memory(&store);
        let transport = Arc::new(RecordingTransport::default());
        let dyn_transport: Arc<dyn MessageTransport> = transport.clone();

        let queue = JobQueue::new(Arc::clone(&stores.jobs), &config.worker);
        let delivery_queue: Arc<dyn DeliveryQueue> = Arc::new(queue.clone());

        let orchestrator = ScanOrchestrator::new(
            sources,
            Arc::clone(&stores.preferences),
            IngestionEngine::new(Arc::clone(&stores.postings)),
            DeliveryPlanner::new(Arc::clone(&stores.users), Arc::clone(&stores.deliveries)),
            Arc::clone(&delivery_queue),
        );

        let notifications = NotificationService::new(
            Arc::clone(&stores.postings),
            Arc::clone(&stores.users),
            Arc::clone(&stores.preferences),
            Arc::clone(&stores.deliveries),
            Arc::clone(&dyn_transport),
        );

        let idle = IdleNotifier::new(
            Arc::clone(&stores.users),
            Arc::clone(&cache),
            Arc::clone(&dyn_transport),
            Duration::from_secs(config.scanner.idle_notice_window_hours * 3600),
        );

        let commands = CommandService::new(
            Arc::clone(&stores.users),
            Arc::clone(&stores.preferences),
            orchestrator.clone(),
            delivery_queue,
            Arc::clone(&cache),
            Arc::clone(&dyn_transport),
            config.scanner.clone(),
        );

        let mut executor = JobExecutor::new();
        executor.register(Arc::new(DeliveryJobHandler::new(notifications.clone())));
        executor.register(Arc::new(ScanJobHandler::new(
            orchestrator.clone(),
            Arc::clone(&cache),
            Some(idle),
            config.scanner.clone(),
            "test",
        )));
        executor.register(Arc::new(HousekeepingJobHandler::new(
            Arc::clone(&stores.postings),
            Arc::clone(&stores.jobs),
            config.housekeeping.retention_days,
        )));
        let executor = Arc::new(executor);

        let runner = |name: &str, concurrency: usize| {
            WorkerRunner::new(
                queue.clone(),
                Arc::clone(&executor),
                name,
                concurrency,
                &config.worker,
                format!("test-{name}"),
            )
        };
        let delivery_worker = runner(queues::DELIVERY, config.worker.delivery_concurrency);
        let scan_worker = runner(queues::SCAN, 1);
        let maintenance_worker = runner(queues::MAINTENANCE, 1);

        Self {
            config,
            store,
            stores,
            cache,
            transport,
            queue,
            orchestrator,
            notifications,
            commands,
            delivery_worker,
            scan_worker,
            maintenance_worker,
        }
    }

    /// Create an active user holding `keywords`.
    pub async fn subscriber(&self, chat: &str, keywords: &[&str]) -> User {
        let user = self.stores.users.upsert_active(chat).await.unwrap();
        for k in keywords {
            self.stores.preferences.add(user.id, &kw(k)).await.unwrap();
        }
        user
    }

    /// Reload a user.
    pub async fn user(&self, chat: &str) -> User {
        self.stores
            .users
            .find_by_external_id(chat)
            .await
            .unwrap()
            .unwrap()
    }

    /// Run queued deliveries until none are runnable.
    pub async fn drain_deliveries(&self) -> usize {
        self.delivery_worker.drain().await.unwrap()
    }
}
