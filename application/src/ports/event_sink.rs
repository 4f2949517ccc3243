//! Port for lifecycle event delivery.
//!
//! Defines the [`EventSink`] trait for recording [`RunEvent`]s (model calls,
//! phase results, stop decisions) to structured observers.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while sinks receive machine-readable events.
//! A sink failing never affects the run or the other sinks.

use cadence_domain::RunEvent;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum EventSinkError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Sink closed")]
    Closed,
}

/// Observer of run events.
pub trait EventSink: Send + Sync {
    /// Short name used when reporting delivery failures.
    fn name(&self) -> &str {
        "sink"
    }

    /// Deliver one event.
    fn emit(&self, event: &RunEvent) -> Result<(), EventSinkError>;
}

/// No-op implementation for tests and when events are disabled.
pub struct NoEventSink;

impl EventSink for NoEventSink {
    fn emit(&self, _event: &RunEvent) -> Result<(), EventSinkError> {
        Ok(())
    }
}

/// Delivers every event to all registered sinks.
///
/// ```text
/// ModelInvoker / RunObjectiveUseCase
///              │ publish(event)
///      ┌───────┼────────────┐
///      ▼       ▼            ▼
///   Jsonl   Tracing   (any other sink)
/// ```
///
/// Each sink is called even if an earlier one failed; failures are logged
/// and otherwise dropped.
#[derive(Clone, Default)]
pub struct EventFanout {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventFanout {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver `event` to every sink. Returns how many sinks failed.
    pub fn publish(&self, event: &RunEvent) -> usize {
        let mut failures = 0;
        for sink in &self.sinks {
            if let Err(e) = sink.emit(event) {
                failures += 1;
                warn!(
                    "Event sink '{}' failed to record {}: {}",
                    sink.name(),
                    event.name(),
                    e
                );
            }
        }
        failures
    }
}

impl EventSink for EventFanout {
    fn name(&self) -> &str {
        "fanout"
    }

    fn emit(&self, event: &RunEvent) -> Result<(), EventSinkError> {
        self.publish(event);
        Ok(())
    }
}
