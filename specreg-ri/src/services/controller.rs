//! Import job admission and status surface
//!
//! **[RIM-ADM-010]** Single-flight: at most one pipeline run is active at
//! a time. Admission is a check-then-act against the persisted record —
//! not a distributed lock. All callers live in this process, so the only
//! residual race is two handler tasks interleaving between load and save;
//! accepted as a single-process deployment trade-off.

use crate::db::job::JobStore;
use crate::models::{ImportOptions, JobRecord};
use crate::services::orchestrator::ImportOrchestrator;
use chrono::Utc;
use specreg_common::Result;
use std::sync::Arc;

/// Externally callable import job surface
pub struct JobController {
    store: JobStore,
    orchestrator: Arc<ImportOrchestrator>,
}

impl JobController {
    pub fn new(store: JobStore, orchestrator: Arc<ImportOrchestrator>) -> Self {
        Self {
            store,
            orchestrator,
        }
    }

    /// Current job record snapshot
    ///
    /// Always a defensive copy deserialized from the store; callers
    /// cannot mutate orchestrator-owned state through it.
    pub async fn get_import_job_status(&self) -> Result<JobRecord> {
        self.store.load().await
    }

    /// Admit a new import job, or return the live snapshot if one is running
    ///
    /// A start during a live run is a no-op, not an error: the caller
    /// gets the current record and can poll it like any other observer.
    /// Otherwise the freshly seeded record (running, six pending stages)
    /// is persisted and returned immediately; the pipeline continues on a
    /// detached task with no join handle.
    pub async fn start_import_job(&self, options: ImportOptions) -> Result<JobRecord> {
        let current = self.store.load().await?;
        if current.is_running() {
            tracing::info!("Import already running; returning live snapshot");
            return Ok(current);
        }

        let job = JobRecord::started(Utc::now());
        self.store.save(&job).await?;

        tracing::info!(?options, "Import job admitted");

        let orchestrator = Arc::clone(&self.orchestrator);
        let spawned_job = job.clone();
        tokio::spawn(async move {
            orchestrator.run(spawned_job, options).await;
        });

        Ok(job)
    }
}
