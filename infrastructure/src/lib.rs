//! Infrastructure layer for cadence
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod config;
pub mod logging;
pub mod providers;
pub mod workspace;

// Re-export commonly used types
pub use config::{ConfigError, ConfigLoader, FileConfig};
pub use logging::{JsonlEventSink, TracingEventSink};
pub use providers::{
    ProviderAdapter,
    command::{CommandProvider, CommandSpec},
    routing::RoutingGateway,
    wire::WireFormat,
};
pub use workspace::FsWorkspaceStore;
