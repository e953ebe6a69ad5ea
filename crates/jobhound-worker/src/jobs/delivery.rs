//! Delivery job handler.

use async_trait::async_trait;
use serde_json::Value;

use jobhound_entity::job::{DeliveryTask, Job, job_types};
use jobhound_service::NotificationService;

use crate::executor::{JobExecutionError, JobHandler};

/// Runs `deliver_posting` jobs through the notification service.
#[derive(Clone)]
pub struct DeliveryJobHandler {
    notifications: NotificationService,
}

impl DeliveryJobHandler {
    /// Create a delivery handler.
    pub fn new(notifications: NotificationService) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl JobHandler for DeliveryJobHandler {
    fn job_type(&self) -> &str {
        job_types::DELIVER_POSTING
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let task: DeliveryTask = job
            .payload_as()
            .map_err(|e| JobExecutionError::Permanent(format!("Invalid delivery payload: {e}")))?;

        let outcome = self.notifications.deliver(&task).await?;
        Ok(Some(serde_json::to_value(outcome).map_err(jobhound_core::AppError::from)?))
    }
}
