//! Sending one delivery task through the messaging transport.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use jobhound_core::traits::transport::{MessageTransport, SendError};
use jobhound_core::{AppError, AppResult, Keyword};
use jobhound_database::store::{DeliveryLedger, PostingStore, PreferenceStore, UserStore};
use jobhound_entity::job::DeliveryTask;
use jobhound_entity::posting::Posting;
use jobhound_entity::user::User;

use crate::format::format_posting;

/// What happened to one delivery task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    /// The posting no longer exists; nothing was sent.
    pub posting_missing: bool,
    /// Messages sent and recorded.
    pub sent: usize,
    /// Recipients skipped because the pair was already delivered or in flight.
    pub already_delivered: usize,
    /// Recipients deactivated after a permanent failure.
    pub deactivated: usize,
    /// Recipients whose send failed transiently.
    pub failed: usize,
}

/// Executes delivery tasks: resolve recipients, claim, send, record.
#[derive(Clone)]
pub struct NotificationService {
    postings: Arc<dyn PostingStore>,
    users: Arc<dyn UserStore>,
    preferences: Arc<dyn PreferenceStore>,
    ledger: Arc<dyn DeliveryLedger>,
    transport: Arc<dyn MessageTransport>,
}

impl NotificationService {
    /// Create a notification service.
    pub fn new(
        postings: Arc<dyn PostingStore>,
        users: Arc<dyn UserStore>,
        preferences: Arc<dyn PreferenceStore>,
        ledger: Arc<dyn DeliveryLedger>,
        transport: Arc<dyn MessageTransport>,
    ) -> Self {
        Self {
            postings,
            users,
            preferences,
            ledger,
            transport,
        }
    }

    /// Handle one task.
    ///
    /// Per-recipient failures are absorbed. Only a transport-wide outage
    /// (`SendError::Unavailable`) or a store error is returned, so the queue
    /// retries the task; pairs already recorded are skipped on the retry.
    pub async fn deliver(&self, task: &DeliveryTask) -> AppResult<DeliveryOutcome> {
        let mut outcome = DeliveryOutcome::default();

        let Some(posting) = self.postings.find_by_id(task.posting_id).await? else {
            warn!(posting_id = %task.posting_id, "Posting not found, dropping delivery");
            outcome.posting_missing = true;
            return Ok(outcome);
        };

        let recipients = self.resolve_recipients(task).await?;
        if recipients.is_empty() {
            debug!(posting_id = %posting.id, keyword = %task.keyword, "No recipients left");
            return Ok(outcome);
        }

        let message = format_posting(&posting, &task.keyword, task.is_manual_scan, Utc::now());

        for user in &recipients {
            self.deliver_to(&posting, user, &message, &mut outcome).await?;
        }

        info!(
            posting_id = %posting.id,
            keyword = %task.keyword,
            manual = task.is_manual_scan,
            sent = outcome.sent,
            skipped = outcome.already_delivered,
            deactivated = outcome.deactivated,
            failed = outcome.failed,
            "Delivery task processed"
        );
        Ok(outcome)
    }

    /// Recipients are resolved when the task runs, not when it was planned.
    async fn resolve_recipients(&self, task: &DeliveryTask) -> AppResult<Vec<User>> {
        if let Some(user_id) = task.triggering_user_id {
            // A manual scan still needs the requester to be subscribed when it lands.
            let user = self.users.find_by_id(user_id).await?.filter(|u| u.active);
            if user.is_none() {
                debug!(user_id = %user_id, "Manual scan requester is gone or stopped");
            }
            return Ok(user.into_iter().collect());
        }

        let Some(keyword) = Keyword::parse(&task.keyword) else {
            return Ok(Vec::new());
        };

        if let Some(user_id) = task.recipient_id {
            let Some(user) = self.users.find_by_id(user_id).await? else {
                return Ok(Vec::new());
            };
            if !user.active || !self.preferences.holds(user.id, &keyword).await? {
                debug!(user_id = %user.id, keyword = %keyword, "Recipient no longer subscribed");
                return Ok(Vec::new());
            }
            return Ok(vec![user]);
        }

        self.users.find_active_by_keyword(&keyword).await
    }

    async fn deliver_to(
        &self,
        posting: &Posting,
        user: &User,
        message: &str,
        outcome: &mut DeliveryOutcome,
    ) -> AppResult<()> {
        let Some(claim) = self.ledger.claim(posting.id, user.id).await? else {
            debug!(posting_id = %posting.id, user_id = %user.id, "Already delivered");
            outcome.already_delivered += 1;
            return Ok(());
        };

        match self.transport.send(&user.external_id, message).await {
            Ok(()) => {
                if let Err(e) = claim.commit().await {
                    error!(
                        posting_id = %posting.id,
                        user_id = %user.id,
                        error = %e,
                        "Message sent but delivery record not written"
                    );
                    outcome.failed += 1;
                } else {
                    outcome.sent += 1;
                }
                Ok(())
            }
            Err(send_err) => {
                if let Err(e) = claim.release().await {
                    warn!(posting_id = %posting.id, user_id = %user.id, error = %e, "Failed to release claim");
                }
                match send_err {
                    SendError::Permanent(reason) => {
                        warn!(
                            user_id = %user.id,
                            transport = self.transport.name(),
                            %reason,
                            "Recipient unreachable, deactivating"
                        );
                        self.users.set_active(user.id, false).await?;
                        outcome.deactivated += 1;
                        Ok(())
                    }
                    SendError::Transient(reason) => {
                        warn!(
                            posting_id = %posting.id,
                            user_id = %user.id,
                            %reason,
                            "Send failed, skipping recipient"
                        );
                        outcome.failed += 1;
                        Ok(())
                    }
                    SendError::Unavailable(reason) => Err(AppError::external(format!(
                        "{} unavailable: {reason}",
                        self.transport.name()
                    ))),
                }
            }
        }
    }
}
