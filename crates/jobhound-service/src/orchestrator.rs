//! One scan pass: keywords × sources → ingest → plan → enqueue.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use jobhound_core::config::scanner::ScannerConfig;
use jobhound_core::{AppResult, Keyword};
use jobhound_database::store::PreferenceStore;
use jobhound_entity::job::DeliveryTask;
use jobhound_sources::SourceAdapter;

use crate::ingest::IngestionEngine;
use crate::planner::{DeliveryPlanner, PlanContext};
use crate::queue::DeliveryQueue;

/// Per-pass limits and trigger context.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOptions {
    /// Per-source, per-keyword ingestion cap.
    pub max_jobs_per_site: usize,
    /// Age window applied to manual scans.
    pub max_age_in_days: Option<f64>,
    /// Interactive scan.
    pub is_manual_scan: bool,
    /// Requester of a manual scan.
    pub triggering_user_id: Option<Uuid>,
    /// Only query the source with this name.
    pub site_hint: Option<String>,
}

impl ScanOptions {
    /// Defaults for the recurring scan.
    pub fn scheduled(config: &ScannerConfig) -> Self {
        Self {
            max_jobs_per_site: config.scheduled_max_jobs_per_site,
            max_age_in_days: None,
            is_manual_scan: false,
            triggering_user_id: None,
            site_hint: None,
        }
    }

    /// Defaults for a scan requested by `user_id`.
    pub fn manual(config: &ScannerConfig, user_id: Uuid) -> Self {
        Self {
            max_jobs_per_site: config.manual_max_jobs_per_site,
            max_age_in_days: Some(config.manual_max_age_days),
            is_manual_scan: true,
            triggering_user_id: Some(user_id),
            site_hint: None,
        }
    }

    /// Restrict to one source.
    pub fn with_site_hint(mut self, site: Option<String>) -> Self {
        self.site_hint = site;
        self
    }

    fn plan_context(&self) -> PlanContext {
        PlanContext {
            is_manual_scan: self.is_manual_scan,
            triggering_user_id: self.triggering_user_id,
            max_age_in_days: self.max_age_in_days,
        }
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Distinct keywords scanned.
    pub keywords: usize,
    /// Raw postings returned by sources.
    pub fetched: usize,
    /// Postings accepted by ingestion (new and known).
    pub accepted: usize,
    /// Postings inserted by this pass.
    pub new_postings: usize,
    /// Delivery tasks enqueued.
    pub enqueued: usize,
    /// Source calls that failed.
    pub source_errors: usize,
    /// Postings skipped by ingestion failures.
    pub ingest_errors: usize,
    /// Postings whose planning failed.
    pub plan_errors: usize,
    /// Delivery tasks that could not be enqueued.
    pub enqueue_errors: usize,
}

impl ScanReport {
    /// Whether any part of the pass failed.
    pub fn has_errors(&self) -> bool {
        self.source_errors + self.ingest_errors + self.plan_errors + self.enqueue_errors > 0
    }
}

/// Drives a scan pass end to end.
#[derive(Clone)]
pub struct ScanOrchestrator {
    sources: Vec<Arc<dyn SourceAdapter>>,
    preferences: Arc<dyn PreferenceStore>,
    ingestion: IngestionEngine,
    planner: DeliveryPlanner,
    queue: Arc<dyn DeliveryQueue>,
}

impl ScanOrchestrator {
    /// Create an orchestrator.
    pub fn new(
        sources: Vec<Arc<dyn SourceAdapter>>,
        preferences: Arc<dyn PreferenceStore>,
        ingestion: IngestionEngine,
        planner: DeliveryPlanner,
        queue: Arc<dyn DeliveryQueue>,
    ) -> Self {
        Self {
            sources,
            preferences,
            ingestion,
            planner,
            queue,
        }
    }

    /// Run one pass over every keyword currently held by a preference.
    ///
    /// Source, ingestion, planning and enqueue failures are counted in the
    /// report and never abort the pass. Only failing to list keywords does.
    pub async fn run(&self, options: &ScanOptions) -> AppResult<ScanReport> {
        let keywords = self.preferences.distinct_keywords().await?;
        let mut report = ScanReport {
            keywords: keywords.len(),
            ..ScanReport::default()
        };

        if keywords.is_empty() {
            debug!("No preferences held, nothing to scan");
            return Ok(report);
        }

        let sources: Vec<&Arc<dyn SourceAdapter>> = self
            .sources
            .iter()
            .filter(|s| {
                options
                    .site_hint
                    .as_deref()
                    .is_none_or(|hint| s.name().eq_ignore_ascii_case(hint))
            })
            .collect();

        let ctx = options.plan_context();
        let mut planned: HashSet<(Uuid, Uuid)> = HashSet::new();

        for keyword in &keywords {
            let fetches = sources.iter().map(|source| async move {
                (source.name().to_string(), source.fetch(keyword).await)
            });

            for (source_name, result) in join_all(fetches).await {
                let raw = match result {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(source = %source_name, keyword = %keyword, error = %e, "Source fetch failed");
                        report.source_errors += 1;
                        continue;
                    }
                };
                report.fetched += raw.len();

                let ingested = self
                    .ingestion
                    .ingest(&source_name, keyword, &raw, options.max_jobs_per_site)
                    .await;
                report.accepted += ingested.accepted.len();
                report.new_postings += ingested.created_count();
                report.ingest_errors += ingested.failed;

                for posting in ingested.postings() {
                    let targets = match self.planner.plan(posting, keyword, &ctx).await {
                        Ok(targets) => targets,
                        Err(e) => {
                            warn!(posting_id = %posting.id, error = %e, "Planning failed");
                            report.plan_errors += 1;
                            continue;
                        }
                    };

                    for user in targets {
                        if !planned.insert((posting.id, user.id)) {
                            continue;
                        }
                        let task = self.task_for(posting.id, keyword, options, user.id);
                        match self.queue.enqueue_delivery(task).await {
                            Ok(()) => report.enqueued += 1,
                            Err(e) => {
                                warn!(posting_id = %posting.id, user_id = %user.id, error = %e, "Enqueue failed");
                                report.enqueue_errors += 1;
                            }
                        }
                    }
                }
            }
        }

        info!(
            manual = options.is_manual_scan,
            keywords = report.keywords,
            fetched = report.fetched,
            accepted = report.accepted,
            new_postings = report.new_postings,
            enqueued = report.enqueued,
            source_errors = report.source_errors,
            "Scan pass finished"
        );
        Ok(report)
    }

    fn task_for(
        &self,
        posting_id: Uuid,
        keyword: &Keyword,
        options: &ScanOptions,
        user_id: Uuid,
    ) -> DeliveryTask {
        let single = options.is_manual_scan && options.triggering_user_id.is_some();
        DeliveryTask {
            posting_id,
            keyword: keyword.as_str().to_string(),
            is_manual_scan: options.is_manual_scan,
            triggering_user_id: options.triggering_user_id.filter(|_| single),
            recipient_id: (!single).then_some(user_id),
        }
    }
}
