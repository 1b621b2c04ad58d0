//! HTTP API handlers for specreg-ri
//!
//! **[RIM-API-010]** REST + SSE control plane: start an import, poll its
//! record, stream progress events.

pub mod health;
pub mod import_job;
pub mod sse;

pub use health::health_routes;
pub use import_job::import_routes;
pub use sse::import_event_stream;
