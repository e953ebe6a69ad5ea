//! Automatic scan job handler.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use jobhound_cache::keys;
use jobhound_core::config::scanner::ScannerConfig;
use jobhound_core::traits::cache::CacheProvider;
use jobhound_entity::job::{Job, ScanTask, job_types};
use jobhound_service::{IdleNotifier, ScanOptions, ScanOrchestrator};

use crate::executor::{JobExecutionError, JobHandler};

/// Runs one automatic scan pass per `scan_sources` job.
///
/// The pass holds a TTL lock in the cache so two processes never scan at
/// the same time. Manual scans do not come through here.
#[derive(Clone)]
pub struct ScanJobHandler {
    orchestrator: ScanOrchestrator,
    cache: Arc<dyn CacheProvider>,
    idle: Option<IdleNotifier>,
    config: ScannerConfig,
    holder: String,
}

impl ScanJobHandler {
    /// Create a scan handler. `holder` identifies this process; the lock
    /// value is `holder:job_id`.
    pub fn new(
        orchestrator: ScanOrchestrator,
        cache: Arc<dyn CacheProvider>,
        idle: Option<IdleNotifier>,
        config: ScannerConfig,
        holder: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            cache,
            idle,
            config,
            holder: holder.into(),
        }
    }
}

#[async_trait]
impl JobHandler for ScanJobHandler {
    fn job_type(&self) -> &str {
        job_types::SCAN_SOURCES
    }

    async fn execute(&self, job: &Job) -> Result<Option<Value>, JobExecutionError> {
        let task: ScanTask = job
            .payload_as()
            .map_err(|e| JobExecutionError::Permanent(format!("Invalid scan payload: {e}")))?;

        let lock = keys::scan_lock();
        let token = format!("{}:{}", self.holder, job.id);
        let ttl = Duration::from_secs(self.config.scan_lock_ttl_seconds);
        if !self.cache.set_nx(&lock, &token, ttl).await? {
            tracing::info!(job_id = %job.id, "Another scan pass holds the lock, skipping");
            return Ok(Some(json!({ "skipped": "scan lock held" })));
        }

        let options = ScanOptions::scheduled(&self.config).with_site_hint(task.site_hint);
        let result = self.orchestrator.run(&options).await;

        match self.cache.delete_if_eq(&lock, &token).await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                job_id = %job.id,
                "Scan lock expired during the pass; left the new holder's lock in place"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to release scan lock"),
        }

        let report = result?;

        if report.new_postings == 0 {
            if let Some(idle) = &self.idle {
                match idle.notify_idle().await {
                    Ok(sent) => tracing::debug!(sent, "Idle notices processed"),
                    Err(e) => tracing::warn!(error = %e, "Idle notices failed"),
                }
            }
        }

        Ok(Some(serde_json::to_value(&report).map_err(jobhound_core::AppError::from)?))
    }
}
