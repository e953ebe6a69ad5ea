//! Delivery planning: who should hear about a posting.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use jobhound_core::{AppResult, Keyword};
use jobhound_database::store::{DeliveryLedger, UserStore};
use jobhound_entity::posting::Posting;
use jobhound_entity::user::User;

/// How a posting reached the planner.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanContext {
    /// Interactive scan rather than the recurring one.
    pub is_manual_scan: bool,
    /// The user who asked for the manual scan.
    pub triggering_user_id: Option<Uuid>,
    /// Manual scans skip postings first seen longer ago than this.
    pub max_age_in_days: Option<f64>,
}

impl PlanContext {
    /// Context for the recurring scan.
    pub fn automatic() -> Self {
        Self::default()
    }

    /// Context for a scan requested by `user_id`.
    pub fn manual(user_id: Uuid, max_age_in_days: Option<f64>) -> Self {
        Self {
            is_manual_scan: true,
            triggering_user_id: Some(user_id),
            max_age_in_days,
        }
    }

    /// Whether only the triggering user is addressed.
    pub fn is_single_recipient(&self) -> bool {
        self.is_manual_scan && self.triggering_user_id.is_some()
    }
}

/// Computes target users for a posting, minus those already delivered to.
///
/// Never writes the ledger. The ledger lookup here only trims obvious
/// repeats; the send-time claim is what guarantees at most one delivery.
#[derive(Clone)]
pub struct DeliveryPlanner {
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn DeliveryLedger>,
}

impl DeliveryPlanner {
    /// Create a planner.
    pub fn new(users: Arc<dyn UserStore>, ledger: Arc<dyn DeliveryLedger>) -> Self {
        Self { users, ledger }
    }

    /// Plan against the current time.
    pub async fn plan(
        &self,
        posting: &Posting,
        keyword: &Keyword,
        ctx: &PlanContext,
    ) -> AppResult<Vec<User>> {
        self.plan_at(posting, keyword, ctx, Utc::now()).await
    }

    /// Plan as of `now`.
    pub async fn plan_at(
        &self,
        posting: &Posting,
        keyword: &Keyword,
        ctx: &PlanContext,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<User>> {
        if ctx.is_manual_scan {
            if let Some(max_age) = ctx.max_age_in_days {
                if posting.age_in_days_at(now) > max_age {
                    debug!(
                        posting_id = %posting.id,
                        max_age_in_days = max_age,
                        "Posting older than manual scan window"
                    );
                    return Ok(Vec::new());
                }
            }
        }

        let candidates = match ctx.triggering_user_id.filter(|_| ctx.is_manual_scan) {
            Some(user_id) => self.users.find_by_id(user_id).await?.into_iter().collect(),
            None => self.users.find_active_by_keyword(keyword).await?,
        };

        let mut targets = Vec::with_capacity(candidates.len());
        for user in candidates {
            if self.ledger.is_delivered(posting.id, user.id).await? {
                continue;
            }
            targets.push(user);
        }
        Ok(targets)
    }
}
