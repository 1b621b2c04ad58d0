//! Export URL resolution for specreg-ri
//!
//! Provides multi-tier configuration resolution with Database → ENV →
//! TOML priority. The regulator occasionally moves its export endpoints,
//! so operators can repoint a dataset at runtime through the settings
//! table without restarting the service.

use crate::services::fetcher::Dataset;
use specreg_common::config::TomlConfig;
use specreg_common::{Error, Result};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};

/// Resolve the export URL for a dataset from 3-tier configuration
///
/// **Priority:** Database → ENV → TOML
pub async fn resolve_export_url(
    db: &Pool<Sqlite>,
    toml_config: &TomlConfig,
    dataset: Dataset,
) -> Result<String> {
    let mut sources = Vec::new();

    // Tier 1: Database (authoritative)
    let db_url = crate::db::settings::get_export_url(db, dataset).await?;
    if db_url.as_deref().is_some_and(is_valid_url) {
        sources.push("database");
    }

    // Tier 2: Environment variable
    let env_url = std::env::var(dataset.url_env_var()).ok();
    if env_url.as_deref().is_some_and(is_valid_url) {
        sources.push("environment");
    }

    // Tier 3: TOML config
    let toml_url = dataset.toml_url(toml_config);
    if toml_url.map(String::as_str).is_some_and(is_valid_url) {
        sources.push("TOML");
    }

    // Warn if multiple sources (potential misconfiguration)
    if sources.len() > 1 {
        warn!(
            dataset = %dataset,
            "Export URL found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    if let Some(url) = db_url.filter(|u| is_valid_url(u)) {
        info!(dataset = %dataset, "Export URL loaded from database");
        return Ok(url);
    }

    if let Some(url) = env_url.filter(|u| is_valid_url(u)) {
        info!(dataset = %dataset, "Export URL loaded from environment variable");
        return Ok(url);
    }

    if let Some(url) = toml_url.filter(|u| is_valid_url(u)) {
        info!(dataset = %dataset, "Export URL loaded from TOML config");
        return Ok(url.clone());
    }

    Err(Error::Config(format!(
        "{} export URL not configured. Configure one of:\n\
         1. Settings table: key '{}'\n\
         2. Environment: {}=https://...\n\
         3. TOML config: {} = \"https://...\" in {}",
        dataset,
        dataset.url_setting_key(),
        dataset.url_env_var(),
        dataset.url_setting_key(),
        specreg_common::config::default_config_path().display(),
    )))
}

/// Validate an export URL (non-empty, non-whitespace)
fn is_valid_url(url: &str) -> bool {
    !url.trim().is_empty()
}
