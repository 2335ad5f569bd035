//! Pipeline progress events.
//!
//! Pipelines publish one event per stage plus run and dependency boundaries.
//! Every event names its kind and, where relevant, the dependency and stage.

mod event;
mod sink;

pub use event::{BuildEvent, EventKind};
pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
