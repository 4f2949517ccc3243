//! Logging infrastructure: run event sinks.
//!
//! - [`JsonlEventSink`]: one JSON object per line, for machine consumption
//! - [`TracingEventSink`]: mirrors events into `tracing` diagnostics

mod jsonl_sink;
mod tracing_sink;

pub use jsonl_sink::JsonlEventSink;
pub use tracing_sink::TracingEventSink;
