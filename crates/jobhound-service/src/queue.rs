//! Seam between planning and the durable delivery queue.

use async_trait::async_trait;
use uuid::Uuid;

use jobhound_core::AppResult;
use jobhound_entity::job::DeliveryTask;

/// Where planned deliveries go. Implemented by the worker's job queue.
#[async_trait]
pub trait DeliveryQueue: Send + Sync + 'static {
    /// Enqueue one delivery task. At-least-once once this returns `Ok`.
    async fn enqueue_delivery(&self, task: DeliveryTask) -> AppResult<()>;

    /// Cancel not-yet-started deliveries addressed to `user_id`.
    async fn cancel_deliveries_for(&self, user_id: Uuid) -> AppResult<u64>;
}
