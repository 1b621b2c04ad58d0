//! Import pipeline orchestration
//!
//! **[RIM-WF-010]** Drives the six-stage pipeline sequentially:
//! stations → radiolines → permits → prune_associations → associate →
//! cleanup. Ingestion stages dispatch to isolated workers; reconciliation
//! runs only when station or permit ingestion actually changed data;
//! cleanup runs unconditionally.
//!
//! **[RIM-WF-020]** The job record is persisted after every status
//! transition, so a concurrent status poll observes live progress. The
//! orchestrator is the record's only writer.
//!
//! **[RIM-ERR-010]** `run` never propagates an error to its spawner; all
//! failures are captured into the record and logged.

use crate::db::associations;
use crate::db::job::JobStore;
use crate::models::{ImportOptions, JobRecord, JobState, StageId, StageStatus};
use crate::services::dispatcher::WorkerDispatcher;
use crate::services::fetcher::DownloadStore;
use async_trait::async_trait;
use chrono::Utc;
use specreg_common::events::{EventBus, ImportEvent};
use specreg_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Maintenance functions invoked by the pipeline's non-ingestion stages
///
/// The orchestrator only knows their contract: succeed or fail.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Remove stale station↔permit associations
    async fn prune_stations_permits(&self) -> Result<()>;

    /// Recompute station↔permit associations
    async fn associate_stations_with_permits(&self) -> Result<()>;

    /// Remove temporary downloaded artifacts
    async fn cleanup_downloads(&self) -> Result<()>;
}

/// Default reconciler: association SQL plus a downloads-directory sweep
pub struct DbReconciler {
    db: SqlitePool,
    downloads: DownloadStore,
}

impl DbReconciler {
    pub fn new(db: SqlitePool, downloads: DownloadStore) -> Self {
        Self { db, downloads }
    }
}

#[async_trait]
impl Reconciler for DbReconciler {
    async fn prune_stations_permits(&self) -> Result<()> {
        let removed = associations::prune_stations_permits(&self.db).await?;
        tracing::info!(removed, "Stale station-permit associations pruned");
        Ok(())
    }

    async fn associate_stations_with_permits(&self) -> Result<()> {
        let inserted = associations::associate_stations_with_permits(&self.db).await?;
        tracing::info!(inserted, "Station-permit associations recomputed");
        Ok(())
    }

    async fn cleanup_downloads(&self) -> Result<()> {
        let removed = self.downloads.sweep().await?;
        tracing::info!(removed, "Downloaded release files swept");
        Ok(())
    }
}

/// State machine driving one import job to completion
pub struct ImportOrchestrator {
    store: JobStore,
    dispatcher: WorkerDispatcher,
    reconciler: Arc<dyn Reconciler>,
    event_bus: EventBus,
}

impl ImportOrchestrator {
    pub fn new(
        store: JobStore,
        dispatcher: WorkerDispatcher,
        reconciler: Arc<dyn Reconciler>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            dispatcher,
            reconciler,
            event_bus,
        }
    }

    /// Drive an admitted job through the pipeline, fire-and-forget
    ///
    /// Completion is observable only through the persisted record (and,
    /// advisorily, the event bus). The terminal `state`/`finished_at` are
    /// persisted *before* the cleanup stage executes, so a poller may
    /// briefly see a terminal job whose cleanup stage is still running.
    pub async fn run(&self, mut job: JobRecord, options: ImportOptions) {
        tracing::info!(?options, "Import pipeline started");
        self.event_bus.emit_lossy(ImportEvent::ImportJobStarted {
            timestamp: Utc::now(),
        });

        let outcome = self.run_pipeline(&mut job, &options).await;

        match &outcome {
            Ok(()) => {
                job.state = JobState::Success;
                job.error = None;
            }
            Err(e) => {
                tracing::error!(error = %e, "Import pipeline failed");
                job.state = JobState::Error;
                job.error = Some(e.to_string());
            }
        }
        job.finished_at = Some(Utc::now());
        if let Err(e) = self.store.save(&job).await {
            tracing::error!(error = %e, "Failed to persist terminal job state");
        }
        self.event_bus.emit_lossy(ImportEvent::ImportJobFinished {
            state: match job.state {
                JobState::Success => "success".to_string(),
                _ => "error".to_string(),
            },
            error: job.error.clone(),
            timestamp: Utc::now(),
        });

        // Cleanup always runs; its failure never rewrites the job outcome
        self.run_cleanup(&mut job).await;

        tracing::info!(state = ?job.state, "Import pipeline finished");
    }

    async fn run_pipeline(&self, job: &mut JobRecord, options: &ImportOptions) -> Result<()> {
        let mut stations_changed = false;
        let mut permits_changed = false;

        for stage in StageId::INGESTION {
            if !options.stage_enabled(stage) {
                tracing::info!(stage = %stage, "Ingestion stage disabled by options");
                job.mark_skipped(stage);
                self.finish_stage(job, stage).await?;
                continue;
            }

            self.begin_stage(job, stage).await?;

            match self.dispatcher.run(stage.as_str()).await {
                Ok(true) => {
                    job.mark_success(stage);
                    self.finish_stage(job, stage).await?;
                    match stage {
                        StageId::Stations => stations_changed = true,
                        StageId::Permits => permits_changed = true,
                        _ => {}
                    }
                }
                Ok(false) => {
                    // skipped = no new state, success = state changed
                    job.mark_skipped(stage);
                    self.finish_stage(job, stage).await?;
                }
                Err(e) => {
                    job.mark_error(stage);
                    if let Err(save_err) = self.finish_stage(job, stage).await {
                        tracing::error!(error = %save_err, "Failed to persist stage failure");
                    }
                    return Err(e);
                }
            }
        }

        // Radio-link changes don't touch the association graph; only
        // station and permit ingestion gate reconciliation.
        if stations_changed || permits_changed {
            self.run_reconcile_stage(job, StageId::PruneAssociations)
                .await?;
            self.run_reconcile_stage(job, StageId::Associate).await?;
        } else {
            tracing::info!("No station or permit changes; reconciliation skipped");
            job.mark_skipped(StageId::PruneAssociations);
            self.finish_stage(job, StageId::PruneAssociations).await?;
            job.mark_skipped(StageId::Associate);
            self.finish_stage(job, StageId::Associate).await?;
        }

        Ok(())
    }

    /// Run one reconciliation stage; these only succeed or fail, never skip
    async fn run_reconcile_stage(&self, job: &mut JobRecord, stage: StageId) -> Result<()> {
        self.begin_stage(job, stage).await?;

        let result = match stage {
            StageId::PruneAssociations => self.reconciler.prune_stations_permits().await,
            StageId::Associate => self.reconciler.associate_stations_with_permits().await,
            _ => unreachable!("not a reconciliation stage"),
        };

        match result {
            Ok(()) => {
                job.mark_success(stage);
                self.finish_stage(job, stage).await?;
                Ok(())
            }
            Err(e) => {
                job.mark_error(stage);
                if let Err(save_err) = self.finish_stage(job, stage).await {
                    tracing::error!(error = %save_err, "Failed to persist stage failure");
                }
                Err(e)
            }
        }
    }

    /// Unconditional final stage; persistence here is best-effort
    async fn run_cleanup(&self, job: &mut JobRecord) {
        job.mark_running(StageId::Cleanup);
        if let Err(e) = self.store.save(job).await {
            tracing::error!(error = %e, "Failed to persist cleanup start");
        }
        self.event_bus.emit_lossy(ImportEvent::ImportStageStarted {
            stage: StageId::Cleanup.to_string(),
            timestamp: Utc::now(),
        });

        match self.reconciler.cleanup_downloads().await {
            Ok(()) => job.mark_success(StageId::Cleanup),
            Err(e) => {
                // Recorded on the cleanup stage only; the job outcome
                // set before this stage stands.
                tracing::warn!(error = %e, "Download cleanup failed");
                job.mark_error(StageId::Cleanup);
            }
        }

        if let Err(e) = self.store.save(job).await {
            tracing::error!(error = %e, "Failed to persist cleanup result");
        }
        self.emit_stage_finished(job, StageId::Cleanup);
    }

    /// pending → running, persisted, announced
    async fn begin_stage(&self, job: &mut JobRecord, stage: StageId) -> Result<()> {
        tracing::info!(stage = %stage, "Stage started");
        job.mark_running(stage);
        self.store.save(job).await?;
        self.event_bus.emit_lossy(ImportEvent::ImportStageStarted {
            stage: stage.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Persist a terminal stage status and announce it
    async fn finish_stage(&self, job: &mut JobRecord, stage: StageId) -> Result<()> {
        self.store.save(job).await?;
        self.emit_stage_finished(job, stage);
        Ok(())
    }

    fn emit_stage_finished(&self, job: &JobRecord, stage: StageId) {
        let status = job
            .stage(stage)
            .map(|s| s.status)
            .unwrap_or(StageStatus::Pending);
        tracing::info!(stage = %stage, status = %status, "Stage finished");
        self.event_bus.emit_lossy(ImportEvent::ImportStageFinished {
            stage: stage.to_string(),
            status: status.to_string(),
            timestamp: Utc::now(),
        });
    }
}
