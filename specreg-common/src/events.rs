//! Event types for the specreg event system
//!
//! Provides shared event definitions and the EventBus used to stream
//! import progress to connected UIs over SSE. Events are advisory: the
//! persisted job record is the source of truth, and a subscriber that
//! misses events loses nothing it cannot recover by polling.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Import pipeline events
///
/// Stage identifiers travel as their snake_case names so this crate does
/// not depend on the import service's model types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImportEvent {
    /// A new import job was admitted and its pipeline spawned
    ImportJobStarted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pipeline stage began executing
    ImportStageStarted {
        stage: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A pipeline stage reached a terminal status
    ImportStageFinished {
        stage: String,
        /// Terminal status name: "success", "skipped" or "error"
        status: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The job reached a terminal state (before the cleanup stage runs)
    ImportJobFinished {
        /// Terminal state name: "success" or "error"
        state: String,
        error: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ImportEvent {
    /// SSE event name for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            ImportEvent::ImportJobStarted { .. } => "ImportJobStarted",
            ImportEvent::ImportStageStarted { .. } => "ImportStageStarted",
            ImportEvent::ImportStageFinished { .. } => "ImportStageFinished",
            ImportEvent::ImportJobFinished { .. } => "ImportJobFinished",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for application-wide events
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// `capacity` is the number of events buffered before old events are
    /// dropped for lagging subscribers. 100 is plenty for a six-stage
    /// pipeline; tests can go as low as 10.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` if none are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ImportEvent,
    ) -> Result<usize, broadcast::error::SendError<ImportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring whether anyone is listening
    ///
    /// The orchestrator uses this for progress events: having no SSE
    /// client connected is the normal case, not an error.
    pub fn emit_lossy(&self, event: ImportEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event emitted with no subscribers");
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();

        bus.emit(ImportEvent::ImportStageStarted {
            stage: "stations".to_string(),
            timestamp: chrono::Utc::now(),
        })
        .unwrap();

        match rx.recv().await.unwrap() {
            ImportEvent::ImportStageStarted { stage, .. } => assert_eq!(stage, "stations"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_an_error_emit_lossy_is_not() {
        let bus = EventBus::new(10);

        let result = bus.emit(ImportEvent::ImportJobStarted {
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());

        // Must not panic or return an error
        bus.emit_lossy(ImportEvent::ImportJobStarted {
            timestamp: chrono::Utc::now(),
        });
    }

    #[test]
    fn event_type_names_are_stable() {
        let event = ImportEvent::ImportJobFinished {
            state: "success".to_string(),
            error: None,
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(event.event_type(), "ImportJobFinished");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ImportJobFinished");
    }
}
