//! Import Job State Machine Tests
//! Test File: workflow_tests.rs
//! Requirements: RIM-WF-010 (Stage Sequence), RIM-WF-020 (Status Ledger)

use chrono::Utc;
use specreg_ri::models::{ImportOptions, JobRecord, JobState, StageId, StageStatus};

/// TC-WF-001: Fresh job seeds all stages pending, in canonical order
/// **Requirement:** RIM-WF-010 | **Type:** Unit | **Priority:** P0
#[test]
fn tc_wf_001_new_job_stage_order() {
    // Given/When: a freshly admitted job
    let job = JobRecord::started(Utc::now());

    // Then: running, started, six pending stages in pipeline order
    assert_eq!(job.state, JobState::Running);
    assert!(job.started_at.is_some());
    assert!(job.finished_at.is_none());
    assert!(job.error.is_none());

    let ids: Vec<StageId> = job.steps.iter().map(|s| s.id).collect();
    assert_eq!(ids, StageId::ALL.to_vec());
    assert!(job.steps.iter().all(|s| s.status == StageStatus::Pending));
}

/// TC-WF-002: pending → running stamps started_at
/// **Requirement:** RIM-WF-020 | **Type:** Unit | **Priority:** P0
#[test]
fn tc_wf_002_mark_running_stamps_started_at() {
    let mut job = JobRecord::started(Utc::now());

    job.mark_running(StageId::Stations);

    let stage = job.stage(StageId::Stations).unwrap();
    assert_eq!(stage.status, StageStatus::Running);
    assert!(stage.started_at.is_some());
    assert!(stage.finished_at.is_none());
}

/// TC-WF-003: terminal marks stamp finished_at, monotonic with started_at
/// **Requirement:** RIM-WF-020 | **Type:** Unit | **Priority:** P0
#[test]
fn tc_wf_003_terminal_marks_stamp_finished_at() {
    let mut job = JobRecord::started(Utc::now());

    job.mark_running(StageId::Stations);
    job.mark_success(StageId::Stations);
    job.mark_running(StageId::Radiolines);
    job.mark_error(StageId::Radiolines);

    for id in [StageId::Stations, StageId::Radiolines] {
        let stage = job.stage(id).unwrap();
        let started = stage.started_at.expect("started_at set");
        let finished = stage.finished_at.expect("finished_at set");
        assert!(started <= finished, "{}: started_at > finished_at", id);
        assert!(stage.status.is_terminal());
    }
}

/// TC-WF-004: a stage skipped without running never gets started_at
/// **Requirement:** RIM-WF-020 | **Type:** Unit | **Priority:** P1
#[test]
fn tc_wf_004_skip_without_start_has_no_started_at() {
    let mut job = JobRecord::started(Utc::now());

    job.mark_skipped(StageId::Permits);

    let stage = job.stage(StageId::Permits).unwrap();
    assert_eq!(stage.status, StageStatus::Skipped);
    assert!(stage.started_at.is_none());
    assert!(stage.finished_at.is_some());
}

/// TC-WF-005: the pre-first-run record is idle with no stages
/// **Requirement:** RIM-WF-010 | **Type:** Unit | **Priority:** P1
#[test]
fn tc_wf_005_idle_record_shape() {
    let record = JobRecord::idle();

    assert_eq!(record.state, JobState::Idle);
    assert!(!record.is_running());
    assert!(!record.is_terminal());
    assert!(record.steps.is_empty());
    assert!(record.started_at.is_none());
}

/// TC-WF-006: stage names round-trip and double as task identifiers
/// **Requirement:** RIM-WF-010 | **Type:** Unit | **Priority:** P1
#[test]
fn tc_wf_006_stage_id_name_roundtrip() {
    for id in StageId::ALL {
        let name = id.as_str();
        let parsed: StageId = name.parse().expect("stage name parses");
        assert_eq!(parsed, id);
        assert_eq!(id.to_string(), name);
    }

    assert!("fingerprinting".parse::<StageId>().is_err());
    assert_eq!(StageId::PruneAssociations.as_str(), "prune_associations");
}

/// TC-WF-007: ImportOptions default to everything enabled
/// **Requirement:** RIM-ADM-010 | **Type:** Unit | **Priority:** P0
#[test]
fn tc_wf_007_import_options_defaults() {
    // Empty request body means "import everything"
    let options: ImportOptions = serde_json::from_str("{}").unwrap();
    assert!(options.import_stations);
    assert!(options.import_radiolines);
    assert!(options.import_permits);

    // Partial overrides leave the rest enabled
    let options: ImportOptions = serde_json::from_str(r#"{"import_radiolines": false}"#).unwrap();
    assert!(options.import_stations);
    assert!(!options.import_radiolines);
    assert!(options.import_permits);
}

/// TC-WF-008: options gate only the ingestion stages
/// **Requirement:** RIM-ADM-010 | **Type:** Unit | **Priority:** P1
#[test]
fn tc_wf_008_options_gate_only_ingestion() {
    let options = ImportOptions {
        import_stations: false,
        import_radiolines: false,
        import_permits: false,
    };

    assert!(!options.stage_enabled(StageId::Stations));
    assert!(!options.stage_enabled(StageId::Radiolines));
    assert!(!options.stage_enabled(StageId::Permits));
    // Reconciliation and cleanup are never option-gated
    assert!(options.stage_enabled(StageId::PruneAssociations));
    assert!(options.stage_enabled(StageId::Associate));
    assert!(options.stage_enabled(StageId::Cleanup));
}

/// TC-WF-009: the persisted JSON shape survives a round-trip
/// **Requirement:** RIM-DB-020 | **Type:** Unit | **Priority:** P0
#[test]
fn tc_wf_009_job_record_serde_roundtrip() {
    let mut job = JobRecord::started(Utc::now());
    job.mark_running(StageId::Stations);
    job.mark_success(StageId::Stations);
    job.mark_skipped(StageId::Radiolines);
    job.state = JobState::Error;
    job.error = Some("boom".to_string());
    job.finished_at = Some(Utc::now());

    let json = serde_json::to_string(&job).unwrap();
    let loaded: JobRecord = serde_json::from_str(&json).unwrap();

    assert_eq!(loaded.state, JobState::Error);
    assert_eq!(loaded.error.as_deref(), Some("boom"));
    let ids: Vec<StageId> = loaded.steps.iter().map(|s| s.id).collect();
    assert_eq!(ids, StageId::ALL.to_vec());
    assert_eq!(
        loaded.stage(StageId::Stations).unwrap().status,
        StageStatus::Success
    );
    assert_eq!(
        loaded.stage(StageId::Radiolines).unwrap().status,
        StageStatus::Skipped
    );
    assert_eq!(
        loaded.stage(StageId::Permits).unwrap().status,
        StageStatus::Pending
    );
}

/// TC-WF-010: stage statuses serialize as lowercase names
/// **Requirement:** RIM-DB-020 | **Type:** Unit | **Priority:** P2
#[test]
fn tc_wf_010_status_serialization_is_lowercase() {
    let json = serde_json::to_value(StageStatus::Skipped).unwrap();
    assert_eq!(json, serde_json::json!("skipped"));

    let json = serde_json::to_value(JobState::Running).unwrap();
    assert_eq!(json, serde_json::json!("running"));
}
