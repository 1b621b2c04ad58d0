//! Data models for specreg-ri (Regulator Import microservice)
//!
//! - [RIM-WF-010]: Import job state machine
//! - [RIM-WF-020]: Persist-after-transition progress tracking

pub mod import_job;

pub use import_job::{ImportOptions, JobRecord, JobState, Stage, StageId, StageStatus};
