//! specreg-ri - Regulator Import Microservice
//!
//! **Module Identity:**
//! - Name: specreg-ri (Regulator Import)
//! - Port: 5731
//!
//! **[RIM-OV-010]** Ingests periodic spreadsheet releases from the
//! telecom regulator (station permits, radio-link permits, device
//! registrations) and reconciles station↔permit associations when a
//! release actually changed data.

use anyhow::Result;
use specreg_common::events::EventBus;
use tracing::info;
use tracing_subscriber::EnvFilter;

use specreg_ri::db::job::JobStore;
use specreg_ri::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Config file is optional; a missing file means defaults
    let toml_config =
        specreg_common::config::load_toml_config(&specreg_common::config::default_config_path())
            .unwrap_or_default();

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(toml_config.logging.level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting specreg-ri (Regulator Import) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve and prepare the root folder
    let root_folder = specreg_common::config::resolve_root_folder(None, "SPECREG_ROOT_FOLDER");
    specreg_common::config::ensure_root_folder(&root_folder)
        .map_err(|e| anyhow::anyhow!("Failed to initialize root folder: {}", e))?;
    info!("Root folder: {}", root_folder.display());

    // Open or create the database
    let db_path = specreg_common::config::database_path(&root_folder);
    info!("Database: {}", db_path.display());
    let db_pool = specreg_ri::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    // A job left running by a previous process can never progress
    let store = JobStore::new(db_pool.clone());
    if store.recover_stale_job().await? {
        info!("Stale import job from previous run marked failed");
    }

    // Event bus for SSE broadcasting
    let event_bus = EventBus::new(100);

    // Wire the import pipeline and application state
    let controller = specreg_ri::services::default_controller(
        db_pool.clone(),
        event_bus.clone(),
        toml_config,
        &root_folder,
    );
    let state = AppState::new(db_pool, event_bus, controller);

    let app = specreg_ri::build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:5731").await?;
    info!("Listening on http://127.0.0.1:5731");
    info!("Health check: http://127.0.0.1:5731/health");

    axum::serve(listener, app).await?;

    Ok(())
}
