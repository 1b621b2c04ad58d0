//! Settings database operations
//!
//! Provides get/set accessors for the settings table following the
//! key-value pattern. Release hashes and export URL overrides live here;
//! the import job record has its own accessor in `db::job`.

use crate::services::fetcher::Dataset;
use specreg_common::{Error, Result};
use sqlx::{Pool, Sqlite};

/// Get the stored content hash of the last imported release for a dataset
///
/// **Returns:** Some(hex sha256) if a release was imported before, None otherwise
pub async fn get_release_hash(db: &Pool<Sqlite>, dataset: Dataset) -> Result<Option<String>> {
    get_setting::<String>(db, dataset.hash_setting_key()).await
}

/// Store the content hash of a newly imported release
pub async fn set_release_hash(db: &Pool<Sqlite>, dataset: Dataset, hash: &str) -> Result<()> {
    set_setting(db, dataset.hash_setting_key(), hash).await
}

/// Get the database-level export URL override for a dataset
pub async fn get_export_url(db: &Pool<Sqlite>, dataset: Dataset) -> Result<Option<String>> {
    get_setting::<String>(db, dataset.url_setting_key()).await
}

/// Set the database-level export URL override for a dataset
pub async fn set_export_url(db: &Pool<Sqlite>, dataset: Dataset, url: &str) -> Result<()> {
    set_setting(db, dataset.url_setting_key(), url).await
}

/// Generic setting getter (internal)
async fn get_setting<T>(db: &Pool<Sqlite>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(db)
        .await
        .map_err(Error::Database)?;

    match row {
        Some((value,)) => {
            let parsed = value
                .parse::<T>()
                .map_err(|e| Error::Config(format!("Parse setting failed: {}", e)))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Generic setting setter (internal)
async fn set_setting<T>(db: &Pool<Sqlite>, key: &str, value: T) -> Result<()>
where
    T: std::fmt::Display,
{
    sqlx::query(
        "INSERT INTO settings (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(key)
    .bind(value.to_string())
    .execute(db)
    .await
    .map_err(Error::Database)?;

    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;

    /// Setup in-memory test database with settings table
    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn release_hash_absent_before_first_import() {
        let pool = setup_test_db().await;

        let result = get_release_hash(&pool, Dataset::Stations).await.unwrap();

        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn release_hash_roundtrip() {
        let pool = setup_test_db().await;

        set_release_hash(&pool, Dataset::Stations, "abc123")
            .await
            .unwrap();

        let result = get_release_hash(&pool, Dataset::Stations).await.unwrap();
        assert_eq!(result, Some("abc123".to_string()));
    }

    #[tokio::test]
    async fn release_hashes_are_per_dataset() {
        let pool = setup_test_db().await;

        set_release_hash(&pool, Dataset::Stations, "station-hash")
            .await
            .unwrap();
        set_release_hash(&pool, Dataset::Permits, "permit-hash")
            .await
            .unwrap();

        assert_eq!(
            get_release_hash(&pool, Dataset::Stations).await.unwrap(),
            Some("station-hash".to_string())
        );
        assert_eq!(
            get_release_hash(&pool, Dataset::Permits).await.unwrap(),
            Some("permit-hash".to_string())
        );
        assert_eq!(
            get_release_hash(&pool, Dataset::Radiolines).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn set_release_hash_updates_existing_row() {
        let pool = setup_test_db().await;

        set_release_hash(&pool, Dataset::Radiolines, "old")
            .await
            .unwrap();
        set_release_hash(&pool, Dataset::Radiolines, "new")
            .await
            .unwrap();

        assert_eq!(
            get_release_hash(&pool, Dataset::Radiolines).await.unwrap(),
            Some("new".to_string())
        );

        // UPSERT, not insert-duplicate
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM settings WHERE key = ?")
            .bind(Dataset::Radiolines.hash_setting_key())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn export_url_roundtrip() {
        let pool = setup_test_db().await;

        set_export_url(&pool, Dataset::Permits, "https://regulator.example/permits.xlsx")
            .await
            .unwrap();

        assert_eq!(
            get_export_url(&pool, Dataset::Permits).await.unwrap(),
            Some("https://regulator.example/permits.xlsx".to_string())
        );
    }
}
