//! Worker dispatch over a message-passing boundary
//!
//! **[RIM-DSP-010]** Each `run` call spawns one isolated tokio task for
//! the named import task and waits for its result on a oneshot channel.
//! The orchestrator's own execution context never carries the fetch or
//! hashing work, so concurrent request handling stays responsive.
//!
//! No internal retries — retry policy belongs to the caller. Each call
//! is independent and stateless.

use crate::services::tasks::ImportTask;
use specreg_common::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Name → task registry plus the dispatch primitive
#[derive(Default)]
pub struct WorkerDispatcher {
    tasks: HashMap<String, Arc<dyn ImportTask>>,
}

impl WorkerDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under its dispatch name
    pub fn register(&mut self, name: impl Into<String>, task: Arc<dyn ImportTask>) {
        self.tasks.insert(name.into(), task);
    }

    /// Run one task in an isolated worker and await its "changed" result
    ///
    /// Failure modes, all surfaced as `Err`:
    /// - unknown task name (dispatch failure)
    /// - the task returned an error
    /// - the worker died without reporting (panic/abort) — observed as the
    ///   reply channel closing
    pub async fn run(&self, task_name: &str) -> Result<bool> {
        let task = self
            .tasks
            .get(task_name)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("No import task registered for '{}'", task_name)))?;

        let (tx, rx) = oneshot::channel();
        let name = task_name.to_string();

        tokio::spawn(async move {
            let result = task.run().await;
            if tx.send(result).is_err() {
                // Receiver dropped: the orchestrator gave up on this run
                tracing::warn!(task = %name, "Worker result discarded, no receiver");
            }
        });

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::Internal(format!(
                "Worker for task '{}' exited without reporting a result",
                task_name
            ))),
        }
    }
}
