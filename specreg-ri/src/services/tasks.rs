//! Ingestion task contract and default implementations
//!
//! **[RIM-TSK-010]** An ingestion task reports `Ok(true)` when it wrote
//! new or changed data, `Ok(false)` when nothing changed, and `Err` on
//! unrecoverable failure. The orchestrator uses the boolean to decide
//! whether reconciliation needs to run at all.

use crate::db;
use crate::services::fetcher::{Dataset, ReleaseSource};
use async_trait::async_trait;
use specreg_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;

/// One unit of ingestion work executed inside an isolated worker
#[async_trait]
pub trait ImportTask: Send + Sync {
    async fn run(&self) -> Result<bool>;
}

/// Default ingestion task: download one dataset release and report
/// whether its content differs from the previously imported release.
///
/// Change detection is by SHA-256 of the downloaded payload against the
/// hash stored at the last accepted import. Spreadsheet rows are never
/// interpreted here; row-level import belongs to the surrounding service.
pub struct ReleaseIngestTask {
    dataset: Dataset,
    source: Arc<dyn ReleaseSource>,
    db: SqlitePool,
}

impl ReleaseIngestTask {
    pub fn new(dataset: Dataset, source: Arc<dyn ReleaseSource>, db: SqlitePool) -> Self {
        Self {
            dataset,
            source,
            db,
        }
    }
}

#[async_trait]
impl ImportTask for ReleaseIngestTask {
    async fn run(&self) -> Result<bool> {
        let release = self.source.download(self.dataset).await?;

        let previous = db::settings::get_release_hash(&self.db, self.dataset).await?;
        if previous.as_deref() == Some(release.sha256.as_str()) {
            tracing::info!(
                dataset = %self.dataset,
                sha256 = %release.sha256,
                "Release unchanged since last import"
            );
            return Ok(false);
        }

        db::settings::set_release_hash(&self.db, self.dataset, &release.sha256).await?;
        let guid = db::releases::record_release(
            &self.db,
            self.dataset,
            &release.sha256,
            &release.path,
        )
        .await?;

        tracing::info!(
            dataset = %self.dataset,
            release_guid = %guid,
            bytes = release.bytes,
            "New release recorded"
        );

        Ok(true)
    }
}
