//! LLM provider adapters.
//!
//! - [`command::CommandProvider`]: runs a provider client executable per
//!   generation and speaks one of the [`wire::WireFormat`]s over stdio
//! - [`routing::RoutingGateway`]: the `LlmGateway` the application sees;
//!   dispatches each candidate to the adapter for its provider

pub mod command;
pub mod routing;
pub mod wire;

use async_trait::async_trait;
use cadence_application::ports::llm_gateway::{GatewayError, LlmSession};
use cadence_domain::{ModelCandidate, ProviderId};

#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn provider(&self) -> &ProviderId;
    async fn create_session(
        &self,
        candidate: &ModelCandidate,
    ) -> Result<Box<dyn LlmSession>, GatewayError>;
}

