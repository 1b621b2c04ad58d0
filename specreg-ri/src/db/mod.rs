//! Database access for specreg-ri
//!
//! **[RIM-DB-010]** All state lives in one SQLite database (`specreg.db`
//! in the root folder): the settings key-value table (which also holds
//! the import job record), downloaded release metadata, and the minimum
//! reconciliation surface (stations, permits, station_permits). The full
//! relational schema of imported rows belongs to the surrounding service.

pub mod associations;
pub mod job;
pub mod releases;
pub mod settings;

use specreg_common::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to the database at `db_path`, creating it (and its parent
/// directory) if missing, then creates tables idempotently.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Initialize specreg-ri tables if they don't exist
///
/// Public so integration tests can prepare in-memory pools.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    // Settings table: generic key-value persistence; also carries the
    // import job record under the `import.job` key.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per downloaded regulator release
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS import_releases (
            guid TEXT PRIMARY KEY,
            dataset TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            file_path TEXT NOT NULL,
            downloaded_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Reconciliation surface: rows are written by the surrounding
    // service's importers; this service only prunes and recomputes the
    // association table.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS stations (
            guid TEXT PRIMARY KEY,
            station_ref TEXT NOT NULL UNIQUE,
            name TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permits (
            guid TEXT PRIMARY KEY,
            permit_ref TEXT NOT NULL UNIQUE,
            station_ref TEXT,
            valid_until TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS station_permits (
            station_guid TEXT NOT NULL,
            permit_guid TEXT NOT NULL,
            PRIMARY KEY (station_guid, permit_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (settings, import_releases, stations, permits, station_permits)"
    );

    Ok(())
}
