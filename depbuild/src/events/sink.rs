//! Event sinks.

use super::{BuildEvent, EventKind};
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Receives the progress events of a pipeline.
///
/// The sequential pipeline publishes from worker code through
/// [`try_emit`](Self::try_emit); the concurrent pipeline publishes run
/// boundaries through [`emit`](Self::emit).
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publishes an event from async code.
    async fn emit(&self, event: BuildEvent) {
        self.try_emit(event);
    }

    /// Publishes an event without blocking.
    ///
    /// Must never fail; sinks drop events they cannot handle.
    fn try_emit(&self, event: BuildEvent);
}

/// A sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _event: BuildEvent) {}
}

/// A sink that turns events into `tracing` records.
///
/// Failures are logged at `warn`, stage completions at `debug` and
/// everything else at `info`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventSink;

impl EventSink for LoggingEventSink {
    fn try_emit(&self, event: BuildEvent) {
        let kind = event.kind;
        let dependency = event.dependency.as_deref().unwrap_or("-");
        let stage = event.stage.map_or_else(|| "-".to_string(), |s| s.to_string());
        let message = event.message.as_deref().unwrap_or("");

        if kind.is_failure() {
            warn!(event = %kind, dependency, stage = %stage, message, "Event: {}", kind);
        } else if kind == EventKind::StageCompleted {
            debug!(
                event = %kind,
                dependency,
                stage = %stage,
                duration_ms = event.duration_ms,
                "Event: {}", kind
            );
        } else {
            info!(
                event = %kind,
                dependency,
                installed = event.paths.len(),
                message,
                "Event: {}", kind
            );
        }
    }
}

/// A sink that keeps every event in order.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: Mutex<Vec<BuildEvent>>,
}

impl CollectingEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<BuildEvent> {
        self.events.lock().clone()
    }

    /// Returns the kinds of the collected events in order.
    #[must_use]
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().iter().map(|event| event.kind).collect()
    }

    /// Returns the events of one kind.
    #[must_use]
    pub fn of_kind(&self, kind: EventKind) -> Vec<BuildEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind == kind)
            .cloned()
            .collect()
    }

    /// Returns the events about one dependency.
    #[must_use]
    pub fn for_dependency(&self, name: &str) -> Vec<BuildEvent> {
        self.events
            .lock()
            .iter()
            .filter(|event| event.dependency.as_deref() == Some(name))
            .cloned()
            .collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, event: BuildEvent) {
        self.events.lock().push(event);
    }
}
