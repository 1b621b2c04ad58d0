//! Station↔permit association maintenance
//!
//! **[RIM-REC-010]** The association table is derived data: it links a
//! station row to every permit row that references the same station_ref.
//! After station or permit ingestion changes data, stale links are pruned
//! and missing links recomputed. Both operations are idempotent.

use specreg_common::Result;
use sqlx::SqlitePool;

/// Remove associations whose station or permit no longer exists
///
/// Returns the number of association rows removed.
pub async fn prune_stations_permits(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM station_permits
        WHERE station_guid NOT IN (SELECT guid FROM stations)
           OR permit_guid NOT IN (SELECT guid FROM permits)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Recompute station↔permit associations
///
/// Inserts a link for every permit whose station_ref matches a station.
/// Existing links are left untouched (INSERT OR IGNORE), so running this
/// after prune yields exactly the current association graph.
///
/// Returns the number of association rows inserted.
pub async fn associate_stations_with_permits(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        r#"
        INSERT OR IGNORE INTO station_permits (station_guid, permit_guid)
        SELECT s.guid, p.guid
        FROM permits p
        JOIN stations s ON s.station_ref = p.station_ref
        WHERE p.station_ref IS NOT NULL
        "#,
    )
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}
