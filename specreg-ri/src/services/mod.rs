//! Service modules for the regulator import workflow
//!
//! **[RIM-COMP-010]** Component implementations: worker dispatch,
//! ingestion tasks, release download plumbing, pipeline orchestration and
//! job admission.

pub mod controller;
pub mod dispatcher;
pub mod fetcher;
pub mod orchestrator;
pub mod tasks;

pub use controller::JobController;
pub use dispatcher::WorkerDispatcher;
pub use fetcher::{Dataset, DownloadStore, DownloadedRelease, HttpReleaseSource, ReleaseSource};
pub use orchestrator::{DbReconciler, ImportOrchestrator, Reconciler};
pub use tasks::{ImportTask, ReleaseIngestTask};

use crate::db::job::JobStore;
use specreg_common::config::TomlConfig;
use specreg_common::events::EventBus;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::Arc;

/// Wire the default production controller
///
/// Registers one `ReleaseIngestTask` per dataset behind the dispatcher
/// and backs reconciliation with the database plus a downloads sweep.
/// `root` is the service root folder; downloads live in `root/downloads`.
pub fn default_controller(
    db: SqlitePool,
    event_bus: EventBus,
    toml_config: TomlConfig,
    root: &Path,
) -> Arc<JobController> {
    let downloads = DownloadStore::new(root.join("downloads"));
    let source: Arc<dyn ReleaseSource> = Arc::new(HttpReleaseSource::new(
        db.clone(),
        toml_config,
        downloads.clone(),
    ));

    let mut dispatcher = WorkerDispatcher::new();
    for dataset in Dataset::ALL {
        dispatcher.register(
            dataset.as_str(),
            Arc::new(ReleaseIngestTask::new(
                dataset,
                Arc::clone(&source),
                db.clone(),
            )),
        );
    }

    let reconciler = Arc::new(DbReconciler::new(db.clone(), downloads));
    let orchestrator = Arc::new(ImportOrchestrator::new(
        JobStore::new(db.clone()),
        dispatcher,
        reconciler,
        event_bus,
    ));

    Arc::new(JobController::new(JobStore::new(db), orchestrator))
}
