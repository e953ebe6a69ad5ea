//! Chat command handling. One more caller of the scan pipeline.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use jobhound_cache::keys;
use jobhound_core::config::scanner::ScannerConfig;
use jobhound_core::traits::cache::CacheProvider;
use jobhound_core::traits::transport::MessageTransport;
use jobhound_core::{AppResult, Keyword};
use jobhound_database::store::{PreferenceStore, UserStore};
use jobhound_entity::user::User;
use uuid::Uuid;

use crate::orchestrator::{ScanOptions, ScanOrchestrator, ScanReport};
use crate::queue::DeliveryQueue;

use super::intent::{Intent, classify};

const WELCOME: &str = "🎉 Welcome to Job Bot!\n\n\
Send me job keywords you're interested in (e.g., 'react', 'python')\n\n\
Commands:\n\
/start - Start the bot\n\
/stop - Unsubscribe\n\
/set - Add keyword\n\
/preferences - View preferences\n\
/clear - Clear preferences\n\
/scan - Manually scan jobs";

const UNSUBSCRIBED: &str =
    "🛑 You have unsubscribed from job alerts. You can /start anytime to re-subscribe.";

const NO_PREFERENCES: &str = "You don't have any preferences set yet.\n\n\
Just send me keywords like 'react' or 'python'! or use /set <keyword>";

const CLEARED: &str = "✅ All preferences cleared!";

const SET_USAGE: &str = "❌ Please provide at least one keyword.\n\n\
Usage: /set react python\n\n\
Or just send keywords directly without any command!";

const SCAN_NEEDS_PREFERENCES: &str = "⚠️ You have no scan preferences set!\n\n\
Please add at least one keyword with /set <keyword> before scanning.";

const SCAN_BUSY: &str = "⏳ Your previous scan is still running. Please wait for it to finish.";

const SCAN_NEEDS_START: &str =
    "⏸️ Notifications are stopped. Send /start to resume, then /scan again.";

const SCAN_FAILED: &str = "❌ Error during scan. Try again later";

/// Commands advertised to the chat client, as `(command, description)`.
pub const BOT_COMMANDS: &[(&str, &str)] = &[
    ("start", "Start the bot and subscribe to job alerts"),
    ("stop", "Unsubscribe from job alerts"),
    ("set", "Set your job search keyword"),
    ("preferences", "View your preferences"),
    ("clear", "Clear all preferences"),
    ("scan", "Manually trigger a job scan"),
];

/// Applies chat intents to users and preferences and replies through the
/// messaging transport.
#[derive(Clone)]
pub struct CommandService {
    users: Arc<dyn UserStore>,
    preferences: Arc<dyn PreferenceStore>,
    orchestrator: ScanOrchestrator,
    queue: Arc<dyn DeliveryQueue>,
    cache: Arc<dyn CacheProvider>,
    transport: Arc<dyn MessageTransport>,
    scanner: ScannerConfig,
}

impl CommandService {
    /// Create a command service.
    pub fn new(
        users: Arc<dyn UserStore>,
        preferences: Arc<dyn PreferenceStore>,
        orchestrator: ScanOrchestrator,
        queue: Arc<dyn DeliveryQueue>,
        cache: Arc<dyn CacheProvider>,
        transport: Arc<dyn MessageTransport>,
        scanner: ScannerConfig,
    ) -> Self {
        Self {
            users,
            preferences,
            orchestrator,
            queue,
            cache,
            transport,
            scanner,
        }
    }

    /// Classify and apply one inbound message from `chat_id`.
    ///
    /// Returns the intent that was applied, or `None` when the text was
    /// ignored.
    pub async fn handle(&self, chat_id: &str, text: &str) -> AppResult<Option<Intent>> {
        let Some(intent) = classify(text) else {
            debug!(chat_id, "Ignoring message");
            return Ok(None);
        };

        match &intent {
            Intent::Subscribe => self.subscribe(chat_id).await?,
            Intent::Unsubscribe => self.unsubscribe(chat_id).await?,
            Intent::SetKeywords(keywords) => self.set_keywords(chat_id, keywords).await?,
            Intent::ViewPreferences => self.view_preferences(chat_id).await?,
            Intent::ClearPreferences => self.clear_preferences(chat_id).await?,
            Intent::ManualScan => self.manual_scan(chat_id).await?,
        }
        Ok(Some(intent))
    }

    async fn subscribe(&self, chat_id: &str) -> AppResult<()> {
        let user = self.users.upsert_active(chat_id).await?;
        info!(user_id = %user.id, "User subscribed");
        self.reply(chat_id, WELCOME).await;
        Ok(())
    }

    async fn unsubscribe(&self, chat_id: &str) -> AppResult<()> {
        if let Some(user) = self.users.find_by_external_id(chat_id).await? {
            self.users.set_active(user.id, false).await?;
            let cancelled = self.queue.cancel_deliveries_for(user.id).await?;
            info!(user_id = %user.id, cancelled, "User unsubscribed");
        }
        self.reply(chat_id, UNSUBSCRIBED).await;
        Ok(())
    }

    async fn set_keywords(&self, chat_id: &str, keywords: &[Keyword]) -> AppResult<()> {
        if keywords.is_empty() {
            self.reply(chat_id, SET_USAGE).await;
            return Ok(());
        }

        // Adding keywords registers a new user but never reactivates one
        // that opted out.
        let user = match self.users.find_by_external_id(chat_id).await? {
            Some(user) => user,
            None => self.users.upsert_active(chat_id).await?,
        };

        let mut added = Vec::new();
        let mut already = Vec::new();
        for keyword in keywords {
            if self.preferences.add(user.id, keyword).await? {
                added.push(keyword.as_str());
            } else {
                already.push(keyword.as_str());
            }
        }
        debug!(user_id = %user.id, added = added.len(), already = already.len(), "Keywords set");

        let mut response = String::new();
        if !added.is_empty() {
            response.push_str(&format!(
                "✅ Added: {}\n\nI'll notify you about new jobs for these keywords.",
                added.join(", ")
            ));
        }
        if !already.is_empty() {
            if !response.is_empty() {
                response.push_str("\n\n");
            }
            response.push_str(&format!("ℹ️ Already tracking: {}", already.join(", ")));
        }
        self.reply(chat_id, &response).await;
        Ok(())
    }

    async fn view_preferences(&self, chat_id: &str) -> AppResult<()> {
        let keywords = match self.users.find_by_external_id(chat_id).await? {
            Some(user) => self.preferences.list_for_user(user.id).await?,
            None => Vec::new(),
        };

        if keywords.is_empty() {
            self.reply(chat_id, NO_PREFERENCES).await;
            return Ok(());
        }

        let list = keywords
            .iter()
            .map(|p| p.keyword.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.reply(
            chat_id,
            &format!("📋 Your job preferences:\n{list}\n\nSend new keywords to add more!"),
        )
        .await;
        Ok(())
    }

    async fn clear_preferences(&self, chat_id: &str) -> AppResult<()> {
        if let Some(user) = self.users.find_by_external_id(chat_id).await? {
            let removed = self.preferences.clear(user.id).await?;
            let cancelled = self.queue.cancel_deliveries_for(user.id).await?;
            info!(user_id = %user.id, removed, cancelled, "Preferences cleared");
        }
        self.reply(chat_id, CLEARED).await;
        Ok(())
    }

    async fn manual_scan(&self, chat_id: &str) -> AppResult<()> {
        let user = match self.scannable_user(chat_id).await? {
            Scannable::Ready(user) => user,
            Scannable::Stopped => {
                self.reply(chat_id, SCAN_NEEDS_START).await;
                return Ok(());
            }
            Scannable::NoPreferences => {
                self.reply(chat_id, SCAN_NEEDS_PREFERENCES).await;
                return Ok(());
            }
        };

        let guard = keys::manual_scan_guard(user.id);
        let token = Uuid::new_v4().to_string();
        let ttl = Duration::from_secs(self.scanner.scan_lock_ttl_seconds);
        if !self.cache.set_nx(&guard, &token, ttl).await? {
            self.reply(chat_id, SCAN_BUSY).await;
            return Ok(());
        }

        let options = ScanOptions::manual(&self.scanner, user.id);
        self.reply(
            chat_id,
            &format!(
                "🔍 Scanning...\n\n\
                 • Max {} jobs per site\n\
                 • Jobs from last {} days only\n\n\
                 This may take a moment...",
                self.scanner.manual_max_jobs_per_site, self.scanner.manual_max_age_days
            ),
        )
        .await;

        let result = self.orchestrator.run(&options).await;

        if let Err(e) = self.cache.delete_if_eq(&guard, &token).await {
            warn!(user_id = %user.id, error = %e, "Failed to release manual scan guard");
        }

        match result {
            Ok(report) => {
                info!(user_id = %user.id, enqueued = report.enqueued, "Manual scan finished");
                self.reply(chat_id, &scan_summary(&report)).await;
            }
            Err(e) => {
                warn!(user_id = %user.id, error = %e, "Manual scan failed");
                self.reply(chat_id, SCAN_FAILED).await;
            }
        }
        Ok(())
    }

    async fn scannable_user(&self, chat_id: &str) -> AppResult<Scannable> {
        let Some(user) = self.users.find_by_external_id(chat_id).await? else {
            return Ok(Scannable::NoPreferences);
        };
        if !user.active {
            return Ok(Scannable::Stopped);
        }
        if self.preferences.list_for_user(user.id).await?.is_empty() {
            return Ok(Scannable::NoPreferences);
        }
        Ok(Scannable::Ready(user))
    }

    /// Replies are best effort; a failed reply never fails the command.
    async fn reply(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.transport.send(chat_id, text).await {
            warn!(chat_id, error = %e, "Failed to send reply");
        }
    }
}

enum Scannable {
    Ready(User),
    /// Sent /stop; a scan would only deliver to a deactivated user.
    Stopped,
    NoPreferences,
}

/// Completion message for a manual scan, including partial failures.
pub fn scan_summary(report: &ScanReport) -> String {
    let mut text = format!(
        "✅ Manual scan completed!\n\n📊 Checked {} jobs, {} new for you.",
        report.accepted, report.enqueued
    );
    if report.has_errors() {
        text.push_str("\n\n⚠️ Some sources could not be reached, results may be incomplete.");
    }
    text
}
