//! Port definitions (interfaces) for external collaborators.
//!
//! Ports are implemented by adapters in the infrastructure and presentation
//! layers and injected into use cases as `Arc<dyn Port>`.

pub mod event_sink;
pub mod human_channel;
pub mod llm_gateway;
pub mod progress;
pub mod prompt_builder;
pub mod workspace;
