//! Import job state machine
//!
//! **[RIM-WF-010]** One import job runs the fixed six-stage pipeline:
//! stations → radiolines → permits → prune_associations → associate → cleanup.
//! Ingestion stages precede reconciliation; cleanup always runs last.
//!
//! **[RIM-WF-020]** The whole record is persisted after every status
//! transition (see `services::orchestrator`), so a concurrent status poll
//! observes live progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pipeline stage identifier, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Station permit ingestion
    Stations,
    /// Radio-link permit ingestion
    Radiolines,
    /// Device registration ingestion
    Permits,
    /// Drop station↔permit associations whose endpoints vanished
    PruneAssociations,
    /// Recompute station↔permit associations
    Associate,
    /// Remove temporary downloaded artifacts
    Cleanup,
}

impl StageId {
    /// Canonical pipeline order
    pub const ALL: [StageId; 6] = [
        StageId::Stations,
        StageId::Radiolines,
        StageId::Permits,
        StageId::PruneAssociations,
        StageId::Associate,
        StageId::Cleanup,
    ];

    /// The three ingestion stages, in order
    pub const INGESTION: [StageId; 3] = [StageId::Stations, StageId::Radiolines, StageId::Permits];

    /// Stable snake_case name; doubles as the worker task identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Stations => "stations",
            StageId::Radiolines => "radiolines",
            StageId::Permits => "permits",
            StageId::PruneAssociations => "prune_associations",
            StageId::Associate => "associate",
            StageId::Cleanup => "cleanup",
        }
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stations" => Ok(StageId::Stations),
            "radiolines" => Ok(StageId::Radiolines),
            "permits" => Ok(StageId::Permits),
            "prune_associations" => Ok(StageId::PruneAssociations),
            "associate" => Ok(StageId::Associate),
            "cleanup" => Ok(StageId::Cleanup),
            _ => Err(format!("Invalid stage id: {}", s)),
        }
    }
}

/// Stage execution status
///
/// `skipped` and `success` are both terminal and both "good": skipped
/// means the stage produced no new state (disabled by options, or the
/// fetched release was unchanged), success means it changed data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Running,
    Success,
    Skipped,
    Error,
}

impl StageStatus {
    /// True once the stage can no longer change status within this run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StageStatus::Success | StageStatus::Skipped | StageStatus::Error
        )
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::Pending => write!(f, "pending"),
            StageStatus::Running => write!(f, "running"),
            StageStatus::Success => write!(f, "success"),
            StageStatus::Skipped => write!(f, "skipped"),
            StageStatus::Error => write!(f, "error"),
        }
    }
}

/// One tracked unit of pipeline work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub status: StageStatus,
    /// Set on pending→running
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub started_at: Option<DateTime<Utc>>,
    /// Set on entering any terminal status
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Stage {
    fn pending(id: StageId) -> Self {
        Self {
            id,
            status: StageStatus::Pending,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Overall job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Success,
    Error,
}

/// Per-job ingestion toggles; a disabled stage is marked skipped without
/// dispatching its worker
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImportOptions {
    #[serde(default = "default_enabled")]
    pub import_stations: bool,
    #[serde(default = "default_enabled")]
    pub import_radiolines: bool,
    #[serde(default = "default_enabled")]
    pub import_permits: bool,
}

fn default_enabled() -> bool {
    true
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            import_stations: true,
            import_radiolines: true,
            import_permits: true,
        }
    }
}

impl ImportOptions {
    /// Options flag gating the given ingestion stage
    ///
    /// Only meaningful for the three ingestion stages; reconciliation and
    /// cleanup stages are never gated by options.
    pub fn stage_enabled(&self, id: StageId) -> bool {
        match id {
            StageId::Stations => self.import_stations,
            StageId::Radiolines => self.import_radiolines,
            StageId::Permits => self.import_permits,
            _ => true,
        }
    }
}

/// Full persisted snapshot of one pipeline run
///
/// The next job overwrites this record; no run history is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub state: JobState,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub steps: Vec<Stage>,
    /// Present if and only if `state == error`
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl JobRecord {
    /// Record reported before any job has ever run
    pub fn idle() -> Self {
        Self {
            state: JobState::Idle,
            started_at: None,
            finished_at: None,
            steps: Vec::new(),
            error: None,
        }
    }

    /// Fresh record for a newly admitted job: running, all stages pending
    pub fn started(now: DateTime<Utc>) -> Self {
        Self {
            state: JobState::Running,
            started_at: Some(now),
            finished_at: None,
            steps: StageId::ALL.iter().copied().map(Stage::pending).collect(),
            error: None,
        }
    }

    /// True while an orchestrator run owns this record
    pub fn is_running(&self) -> bool {
        self.state == JobState::Running
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Success | JobState::Error)
    }

    /// Look up one stage by id
    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.steps.iter().find(|s| s.id == id)
    }

    // A missing stage is a programming error: `started()` seeds one Stage
    // per StageId and nothing removes them.
    fn stage_mut(&mut self, id: StageId) -> &mut Stage {
        self.steps
            .iter_mut()
            .find(|s| s.id == id)
            .expect("job record initialized with all pipeline stages")
    }

    /// pending → running; stamps `started_at`
    pub fn mark_running(&mut self, id: StageId) {
        let stage = self.stage_mut(id);
        stage.status = StageStatus::Running;
        stage.started_at = Some(Utc::now());
    }

    /// → success; stamps `finished_at`
    pub fn mark_success(&mut self, id: StageId) {
        self.finish_stage(id, StageStatus::Success);
    }

    /// → skipped; stamps `finished_at`
    pub fn mark_skipped(&mut self, id: StageId) {
        self.finish_stage(id, StageStatus::Skipped);
    }

    /// → error; stamps `finished_at`
    pub fn mark_error(&mut self, id: StageId) {
        self.finish_stage(id, StageStatus::Error);
    }

    fn finish_stage(&mut self, id: StageId, status: StageStatus) {
        let stage = self.stage_mut(id);
        stage.status = status;
        stage.finished_at = Some(Utc::now());
    }
}
