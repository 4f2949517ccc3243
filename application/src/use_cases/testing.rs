//! Test doubles shared by the use case tests.

use crate::ports::event_sink::{EventSink, EventSinkError};
use crate::ports::llm_gateway::{GatewayError, LlmGateway, LlmSession};
use async_trait::async_trait;
use cadence_domain::{InvocationRequest, ModelCandidate, ProviderResponse, Role, RunEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder =
    dyn Fn(&ModelCandidate, &InvocationRequest) -> Result<ProviderResponse, GatewayError> + Send + Sync;

/// One recorded generation call.
#[derive(Debug, Clone)]
pub(crate) struct RecordedCall {
    pub model: String,
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
}

/// Gateway whose answers come from a closure.
pub(crate) struct ScriptedGateway {
    responder: Arc<Responder>,
    init_failures: HashMap<String, GatewayError>,
    delays: HashMap<String, Duration>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl ScriptedGateway {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&ModelCandidate, &InvocationRequest) -> Result<ProviderResponse, GatewayError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Arc::new(responder),
            init_failures: HashMap::new(),
            delays: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing_init(mut self, model: &str, error: GatewayError) -> Self {
        self.init_failures.insert(model.to_string(), error);
        self
    }

    pub fn with_delay(mut self, model: &str, delay: Duration) -> Self {
        self.delays.insert(model.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn models_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.model).collect()
    }

    /// Number of generation calls whose system prompt contains `marker`.
    pub fn count_system(&self, marker: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.system.contains(marker))
            .count()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    async fn create_session(
        &self,
        candidate: &ModelCandidate,
    ) -> Result<Box<dyn LlmSession>, GatewayError> {
        if let Some(error) = self.init_failures.get(&candidate.model) {
            return Err(error.clone());
        }
        Ok(Box::new(ScriptedSession {
            candidate: candidate.clone(),
            responder: self.responder.clone(),
            delay: self.delays.get(&candidate.model).copied(),
            calls: self.calls.clone(),
        }))
    }
}

struct ScriptedSession {
    candidate: ModelCandidate,
    responder: Arc<Responder>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

#[async_trait]
impl LlmSession for ScriptedSession {
    fn candidate(&self) -> &ModelCandidate {
        &self.candidate
    }

    async fn generate(&self, request: &InvocationRequest) -> Result<ProviderResponse, GatewayError> {
        let content_of = |role: Role| {
            request
                .messages
                .iter()
                .filter(|m| m.role == role)
                .map(|m| m.content.clone())
                .collect::<Vec<_>>()
                .join("\n")
        };
        self.calls.lock().unwrap().push(RecordedCall {
            model: self.candidate.model.clone(),
            system: content_of(Role::System),
            user: content_of(Role::User),
            temperature: request.temperature,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(&self.candidate, request)
    }
}

/// Sink that keeps every event in memory.
#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<RunEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events().iter().map(|e| e.name().to_string()).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &RunEvent) -> Result<(), EventSinkError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
