use super::ProviderAdapter;
use super::command::{CommandProvider, CommandSpec};
use async_trait::async_trait;
use cadence_application::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession};
use cadence_domain::{ModelCandidate, ProviderId};
use std::sync::Arc;

/// Dispatches each candidate to the adapter registered for its provider.
///
/// Registration order matters only when two adapters claim the same
/// provider: the first one wins.
#[derive(Default)]
pub struct RoutingGateway {
    providers: Vec<Arc<dyn ProviderAdapter>>,
}

impl RoutingGateway {
    pub fn new(providers: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { providers }
    }

    /// One [`CommandProvider`] per configured client.
    pub fn from_commands(specs: impl IntoIterator<Item = (ProviderId, CommandSpec)>) -> Self {
        Self::new(
            specs
                .into_iter()
                .map(|(id, spec)| Arc::new(CommandProvider::new(id, spec)) as Arc<dyn ProviderAdapter>)
                .collect(),
        )
    }

    pub fn with_provider(mut self, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push(adapter);
        self
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderId> {
        self.providers.iter().map(|p| p.provider())
    }

    fn resolve_provider(&self, provider: &ProviderId) -> Result<&dyn ProviderAdapter, GatewayError> {
        self.providers
            .iter()
            .find(|p| p.provider() == provider)
            .map(|p| p.as_ref())
            .ok_or_else(|| {
                GatewayError::UnknownProvider(format!("no adapter configured for '{}'", provider))
            })
    }
}

#[async_trait]
impl LlmGateway for RoutingGateway {
    async fn create_session(
        &self,
        candidate: &ModelCandidate,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        self.resolve_provider(&candidate.provider)?
            .create_session(candidate)
            .await
    }
}
