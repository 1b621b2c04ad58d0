//! Downloaded release metadata
//!
//! One row per regulator release an ingestion task accepted as new.
//! Release files themselves are temporary (the cleanup stage removes
//! them); the row keeps the provenance: which dataset, which content
//! hash, when.

use crate::services::fetcher::Dataset;
use chrono::{DateTime, Utc};
use specreg_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use uuid::Uuid;

/// Release row from the database
#[derive(Debug, Clone)]
pub struct ReleaseRecord {
    pub guid: Uuid,
    pub dataset: String,
    pub sha256: String,
    pub file_path: String,
    pub downloaded_at: DateTime<Utc>,
}

/// Record a newly accepted release
pub async fn record_release(
    pool: &SqlitePool,
    dataset: Dataset,
    sha256: &str,
    file_path: &Path,
) -> Result<Uuid> {
    let guid = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO import_releases (guid, dataset, sha256, file_path, downloaded_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind(dataset.as_str())
    .bind(sha256)
    .bind(file_path.display().to_string())
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    Ok(guid)
}

/// Most recently recorded release for a dataset, if any
pub async fn latest_release(pool: &SqlitePool, dataset: Dataset) -> Result<Option<ReleaseRecord>> {
    let row = sqlx::query(
        r#"
        SELECT guid, dataset, sha256, file_path, downloaded_at
        FROM import_releases
        WHERE dataset = ?
        ORDER BY downloaded_at DESC
        LIMIT 1
        "#,
    )
    .bind(dataset.as_str())
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let guid_str: String = row.get("guid");
            let guid = Uuid::parse_str(&guid_str)
                .map_err(|e| Error::Internal(format!("Failed to parse release guid: {}", e)))?;

            let downloaded_at: String = row.get("downloaded_at");
            let downloaded_at = DateTime::parse_from_rfc3339(&downloaded_at)
                .map_err(|e| Error::Internal(format!("Failed to parse downloaded_at: {}", e)))?
                .with_timezone(&Utc);

            Ok(Some(ReleaseRecord {
                guid,
                dataset: row.get("dataset"),
                sha256: row.get("sha256"),
                file_path: row.get("file_path"),
                downloaded_at,
            }))
        }
        None => Ok(None),
    }
}
