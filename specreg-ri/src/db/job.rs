//! Import job persistence
//!
//! **[RIM-DB-020]** The whole job record is one JSON value under a
//! well-known settings key. SQLite replaces the row atomically on upsert,
//! so concurrent status reads see either the old or new record, never a
//! partial one. The orchestrator is the only writer.

use crate::models::{JobRecord, StageStatus};
use specreg_common::{Error, Result};
use sqlx::SqlitePool;

/// Well-known settings key holding the current job record
pub const JOB_STATE_KEY: &str = "import.job";

/// Durable store for the single import job record
#[derive(Clone)]
pub struct JobStore {
    db: SqlitePool,
}

impl JobStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Load the current job record
    ///
    /// An absent key is not an error: it means no job has ever run, and
    /// an idle record is returned.
    pub async fn load(&self) -> Result<JobRecord> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(JOB_STATE_KEY)
            .fetch_optional(&self.db)
            .await?;

        match row {
            Some((value,)) => serde_json::from_str(&value)
                .map_err(|e| Error::Internal(format!("Failed to deserialize job record: {}", e))),
            None => Ok(JobRecord::idle()),
        }
    }

    /// Persist the job record, overwriting the previous snapshot
    pub async fn save(&self, record: &JobRecord) -> Result<()> {
        let value = serde_json::to_string(record)
            .map_err(|e| Error::Internal(format!("Failed to serialize job record: {}", e)))?;

        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(JOB_STATE_KEY)
        .bind(value)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    /// Recover a job left running by a previous process
    ///
    /// **[RIM-INIT-010]** The pipeline runs as a background task that dies
    /// with the process, so a `running` record found at startup can never
    /// progress. Mark it failed so a fresh import can be admitted.
    ///
    /// Returns true if a stale job was recovered.
    pub async fn recover_stale_job(&self) -> Result<bool> {
        let mut record = self.load().await?;
        if !record.is_running() {
            return Ok(false);
        }

        let now = chrono::Utc::now();
        for stage in record.steps.iter_mut() {
            if stage.status == StageStatus::Running {
                stage.status = StageStatus::Error;
                stage.finished_at = Some(now);
            }
        }
        record.state = crate::models::JobState::Error;
        record.error = Some("Import interrupted: service restarted mid-run".to_string());
        record.finished_at = Some(now);

        self.save(&record).await?;

        tracing::warn!("Recovered stale import job left running by a previous process");
        Ok(true)
    }
}
