//! Per-chat ordering for inbound messages.
//!
//! Messages from one chat are handled one after another, in arrival order;
//! different chats proceed in parallel. A chat's worker exists only while it
//! has messages in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time;

use jobhound_service::CommandService;

/// Consumer of one chat message.
#[async_trait]
pub trait ChatHandler: Send + Sync + 'static {
    async fn on_message(&self, chat_id: &str, text: &str);
}

#[async_trait]
impl ChatHandler for CommandService {
    async fn on_message(&self, chat_id: &str, text: &str) {
        match self.handle(chat_id, text).await {
            Ok(Some(intent)) => tracing::debug!(chat_id, ?intent, "Command handled"),
            Ok(None) => {}
            Err(e) => tracing::error!(chat_id, error = %e, "Command failed"),
        }
    }
}

struct ChatQueue {
    tx: mpsc::UnboundedSender<String>,
    /// Sent but not yet handled.
    pending: Arc<AtomicUsize>,
}

pub struct ChatDispatcher<H> {
    handler: Arc<H>,
    chats: HashMap<String, ChatQueue>,
    workers: JoinSet<()>,
}

impl<H: ChatHandler> ChatDispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            chats: HashMap::new(),
            workers: JoinSet::new(),
        }
    }

    /// Queue `text` behind anything still in flight for `chat_id`.
    pub fn dispatch(&mut self, chat_id: String, text: String) {
        self.forget_idle();

        let text = match self.chats.get(&chat_id) {
            Some(queue) => {
                queue.pending.fetch_add(1, Ordering::AcqRel);
                match queue.tx.send(text) {
                    Ok(()) => return,
                    // The worker died mid-handler; start a fresh one.
                    Err(mpsc::error::SendError(text)) => text,
                }
            }
            None => text,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));
        pending.fetch_add(1, Ordering::AcqRel);
        if tx.send(text).is_err() {
            return;
        }
        self.workers.spawn(chat_worker(
            Arc::clone(&self.handler),
            chat_id.clone(),
            rx,
            Arc::clone(&pending),
        ));
        self.chats.insert(chat_id, ChatQueue { tx, pending });
    }

    /// Chats with a live worker.
    pub fn active_chats(&self) -> usize {
        self.chats.len()
    }

    /// Stop accepting messages and wait up to `grace` for queued ones.
    /// Whatever is still running after that is aborted.
    pub async fn shutdown(mut self, grace: Duration) {
        // Dropping the senders lets each worker exit once its queue is empty.
        self.chats.clear();
        let workers = &mut self.workers;
        let drained = time::timeout(grace, async {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "Chat worker panicked");
                }
            }
        })
        .await
        .is_ok();

        if !drained {
            tracing::warn!(
                remaining = self.workers.len(),
                "Chat workers did not finish in time; aborting"
            );
            self.workers.shutdown().await;
        }
    }

    /// Drop senders of chats with nothing in flight, ending their workers.
    /// Only this dispatcher sends, so nothing can slip in after the check.
    fn forget_idle(&mut self) {
        self.chats
            .retain(|_, queue| queue.pending.load(Ordering::Acquire) > 0 && !queue.tx.is_closed());
        while let Some(joined) = self.workers.try_join_next() {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Chat worker panicked");
            }
        }
    }
}

async fn chat_worker<H: ChatHandler>(
    handler: Arc<H>,
    chat_id: String,
    mut rx: mpsc::UnboundedReceiver<String>,
    pending: Arc<AtomicUsize>,
) {
    while let Some(text) = rx.recv().await {
        handler.on_message(&chat_id, &text).await;
        pending.fetch_sub(1, Ordering::AcqRel);
    }
}
