//! Import job API handlers
//!
//! **[RIM-API-010]** POST /import/start, GET /import/status

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::models::{ImportOptions, JobRecord};
use crate::{error::ApiResult, AppState};

/// POST /import/start request body; an empty or missing body uses the
/// default options (all ingestion stages enabled)
#[derive(Debug, Deserialize, Default)]
pub struct StartImportRequest {
    #[serde(default)]
    pub options: ImportOptions,
}

/// POST /import/start
///
/// **[RIM-ADM-010]** Admits a new import job and returns its freshly
/// seeded record, or — when a job is already running — the live record
/// unchanged. Starting during a run is a no-op, not an error; the
/// pipeline itself has no synchronous failure path.
pub async fn start_import(
    State(state): State<AppState>,
    body: Option<Json<StartImportRequest>>,
) -> ApiResult<Json<JobRecord>> {
    let options = body.map(|Json(r)| r.options).unwrap_or_default();

    let record = state.controller.start_import_job(options).await?;

    tracing::info!(state = ?record.state, "Import start requested");
    Ok(Json(record))
}

/// GET /import/status
///
/// Poll the current job record. Never blocks on the pipeline; reads the
/// latest persisted snapshot.
pub async fn get_import_status(State(state): State<AppState>) -> ApiResult<Json<JobRecord>> {
    let record = state.controller.get_import_job_status().await?;

    tracing::debug!(state = ?record.state, "Status query");
    Ok(Json(record))
}

/// Build import job routes
pub fn import_routes() -> Router<AppState> {
    Router::new()
        .route("/import/start", post(start_import))
        .route("/import/status", get(get_import_status))
}
