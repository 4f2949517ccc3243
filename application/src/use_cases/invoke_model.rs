//! Model invocation over a fallback chain.
//!
//! [`ModelInvoker`] tries each candidate of a [`FallbackChain`] in order:
//! open a session, generate, validate. A retryable failure moves on to the
//! next candidate; configuration problems and cancellation stop the walk.
//! Every step is published as a [`RunEvent`].

use crate::ports::event_sink::EventFanout;
use crate::ports::llm_gateway::{GatewayError, LlmGateway};
use crate::use_cases::shared::{cancellable, is_cancelled};
use cadence_domain::session::validation::validate_response;
use cadence_domain::{
    AgentRole, CandidateRef, CandidateTier, FailureClass, FailureKind, FallbackChain, InvocationRequest,
    InvocationResult, ModelCandidate, RunEvent, ValidationOutcome,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A candidate that was tried and failed.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub candidate: ModelCandidate,
    pub kind: FailureKind,
    pub message: String,
}

impl std::fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.candidate, self.kind, self.message)
    }
}

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("Configuration error for {candidate}: {source}")]
    Configuration {
        candidate: ModelCandidate,
        source: GatewayError,
    },

    #[error("All {} candidate(s) failed; first: {}; last: {}", .failures.len(), first_failure(.failures), last_failure(.failures))]
    Exhausted { failures: Vec<CandidateFailure> },

    #[error("Operation cancelled")]
    Cancelled,
}

fn first_failure(failures: &[CandidateFailure]) -> String {
    failures.first().map(|f| f.to_string()).unwrap_or_default()
}

fn last_failure(failures: &[CandidateFailure]) -> String {
    failures.last().map(|f| f.to_string()).unwrap_or_default()
}

impl InvokeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, InvokeError::Cancelled)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, InvokeError::Configuration { .. })
    }

    /// Configuration and cancellation abort the run; exhaustion does not.
    pub fn is_fatal(&self) -> bool {
        self.is_cancelled() || self.is_configuration()
    }
}

/// Why one candidate attempt did not produce a result.
enum AttemptFailure {
    Cancelled,
    Failed { kind: FailureKind, message: String },
    Configuration(GatewayError),
}

/// Invokes models through a gateway, falling back along a chain.
#[derive(Clone)]
pub struct ModelInvoker {
    gateway: Arc<dyn LlmGateway>,
    events: EventFanout,
    timeout: Option<Duration>,
}

impl ModelInvoker {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            gateway,
            events: EventFanout::default(),
            timeout: None,
        }
    }

    pub fn with_events(mut self, events: EventFanout) -> Self {
        self.events = events;
        self
    }

    /// Bound each generation call. An elapsed call counts as a timeout failure.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn events(&self) -> &EventFanout {
        &self.events
    }

    /// Invoke `request` against `chain` on behalf of `role`.
    ///
    /// Returns the first validated result. Candidates after the successful
    /// one are never contacted.
    pub async fn invoke(
        &self,
        role: AgentRole,
        chain: &FallbackChain,
        request: &InvocationRequest,
        cancellation_token: &Option<CancellationToken>,
    ) -> Result<InvocationResult, InvokeError> {
        let mut failures: Vec<CandidateFailure> = Vec::new();

        for (position, candidate) in chain.iter().enumerate() {
            if is_cancelled(cancellation_token) {
                return Err(InvokeError::Cancelled);
            }

            let candidate_ref = CandidateRef {
                role,
                provider: candidate.provider.clone(),
                model: candidate.model.clone(),
                position,
                tier: chain.tier_of(position).unwrap_or(CandidateTier::Primary),
            };

            match self
                .try_candidate(candidate, &candidate_ref, request, cancellation_token)
                .await
            {
                Ok(result) => {
                    if position > 0 {
                        info!(
                            "{} served by fallback candidate {} (position {})",
                            role, candidate, position
                        );
                    }
                    return Ok(result);
                }
                Err(AttemptFailure::Cancelled) => return Err(InvokeError::Cancelled),
                Err(AttemptFailure::Configuration(source)) => {
                    warn!("{}: configuration error for {}: {}", role, candidate, source);
                    return Err(InvokeError::Configuration {
                        candidate: candidate.clone(),
                        source,
                    });
                }
                Err(AttemptFailure::Failed { kind, message }) => {
                    warn!("{}: candidate {} failed ({}): {}", role, candidate, kind, message);
                    failures.push(CandidateFailure {
                        candidate: candidate.clone(),
                        kind,
                        message,
                    });
                }
            }
        }

        self.events.publish(&RunEvent::FallbackExhausted {
            role,
            attempts: failures.len(),
            first_error: first_failure(&failures),
            last_error: last_failure(&failures),
        });
        Err(InvokeError::Exhausted { failures })
    }

    async fn try_candidate(
        &self,
        candidate: &ModelCandidate,
        candidate_ref: &CandidateRef,
        request: &InvocationRequest,
        cancellation_token: &Option<CancellationToken>,
    ) -> Result<InvocationResult, AttemptFailure> {
        // Initialization
        self.events.publish(&RunEvent::LlmInitializationStart {
            candidate: candidate_ref.clone(),
        });
        let session = match cancellable(cancellation_token, self.gateway.create_session(candidate))
            .await
        {
            None => return Err(AttemptFailure::Cancelled),
            Some(Ok(session)) => session,
            Some(Err(e)) => {
                let kind = e.kind();
                self.events.publish(&RunEvent::LlmInitializationError {
                    candidate: candidate_ref.clone(),
                    error: e.to_string(),
                    failure: kind.clone(),
                });
                return Err(Self::attempt_failure(e, kind));
            }
        };
        self.events.publish(&RunEvent::LlmInitializationSuccess {
            candidate: candidate_ref.clone(),
        });

        // Generation
        self.events.publish(&RunEvent::LlmGenerationStart {
            candidate: candidate_ref.clone(),
            messages: request.messages.len(),
        });
        let started = Instant::now();
        let generation = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, session.generate(request))
                    .await
                    .unwrap_or(Err(GatewayError::Timeout)),
                None => session.generate(request).await,
            }
        };
        let outcome = cancellable(cancellation_token, generation).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let response = match outcome {
            None => return Err(AttemptFailure::Cancelled),
            Some(Ok(response)) => response,
            Some(Err(e)) => {
                let kind = e.kind();
                self.events.publish(&RunEvent::LlmGenerationError {
                    candidate: candidate_ref.clone(),
                    error: e.to_string(),
                    failure: kind.clone(),
                    duration_ms,
                });
                return Err(Self::attempt_failure(e, kind));
            }
        };

        // Validation
        let report = validate_response(Some(&response));
        if !report.outcome.is_usable() {
            let kind = match report.outcome {
                ValidationOutcome::EmptyNoToolCalls => FailureKind::EmptyResponse,
                _ => FailureKind::MalformedResponse,
            };
            let message = format!("{}: {}", report.outcome, report.detail);
            self.events.publish(&RunEvent::LlmGenerationError {
                candidate: candidate_ref.clone(),
                error: message.clone(),
                failure: kind.clone(),
                duration_ms,
            });
            return Err(AttemptFailure::Failed { kind, message });
        }

        let result = InvocationResult::from_response(response, candidate.clone());
        debug!(
            "{} answered in {}ms ({} tokens)",
            candidate, duration_ms, result.usage.total_tokens
        );
        self.events.publish(&RunEvent::LlmGenerationSuccess {
            candidate: candidate_ref.clone(),
            usage: result.usage,
            duration_ms,
            content_bytes: result.content.len(),
            tool_calls: result.tool_calls.len(),
        });
        Ok(result)
    }

    fn attempt_failure(error: GatewayError, kind: FailureKind) -> AttemptFailure {
        match kind.class() {
            FailureClass::Cancelled => AttemptFailure::Cancelled,
            FailureClass::Configuration => AttemptFailure::Configuration(error),
            FailureClass::FallbackEligible => AttemptFailure::Failed {
                kind,
                message: error.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::testing::{RecordingSink, ScriptedGateway};
    use cadence_domain::{Choice, ProviderId, ProviderResponse, TokenUsage, ToolCall};

    fn chain() -> FallbackChain {
        FallbackChain::builder(ProviderId::OpenAi, "primary")
            .same_provider(["second"])
            .cross_provider(ProviderId::Anthropic, ["third"])
            .build()
            .unwrap()
    }

    fn request() -> InvocationRequest {
        InvocationRequest::prompt(Some("system"), "hello")
    }

    fn invoker(gateway: &Arc<ScriptedGateway>, sink: &Arc<RecordingSink>) -> ModelInvoker {
        ModelInvoker::new(gateway.clone())
            .with_events(EventFanout::default().with_sink(sink.clone()))
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallbacks() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| {
            Ok(ProviderResponse::from_text("ok").with_usage(TokenUsage::new(10, 2, None)))
        }));
        let sink = Arc::new(RecordingSink::default());

        let result = invoker(&gateway, &sink)
            .invoke(AgentRole::Planner, &chain(), &request(), &None)
            .await
            .unwrap();

        assert_eq!(result.content, "ok");
        assert_eq!(result.candidate.model, "primary");
        assert_eq!(result.usage.total_tokens, 12);
        assert_eq!(gateway.models_called(), vec!["primary"]);
        assert_eq!(
            sink.names(),
            vec![
                "llm_initialization_start",
                "llm_initialization_success",
                "llm_generation_start",
                "llm_generation_success",
            ]
        );
    }

    #[tokio::test]
    async fn test_falls_back_in_order_until_success() {
        let gateway = Arc::new(ScriptedGateway::new(|candidate, _| match candidate.model.as_str() {
            "primary" => Err(GatewayError::Status {
                status: 503,
                message: "unavailable".into(),
            }),
            "second" => Ok(ProviderResponse::from_text("   ")),
            _ => Ok(ProviderResponse::from_text("from third")),
        }));
        let sink = Arc::new(RecordingSink::default());

        let result = invoker(&gateway, &sink)
            .invoke(AgentRole::Executor, &chain(), &request(), &None)
            .await
            .unwrap();

        assert_eq!(result.content, "from third");
        assert_eq!(result.candidate.provider, ProviderId::Anthropic);
        assert_eq!(gateway.models_called(), vec!["primary", "second", "third"]);

        let errors: Vec<_> = sink
            .events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::LlmGenerationError { candidate, failure, .. } => {
                    Some((candidate.position, failure))
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            errors,
            vec![
                (0, FailureKind::ServerError { status: Some(503) }),
                (1, FailureKind::EmptyResponse),
            ]
        );
    }

    #[tokio::test]
    async fn test_tool_call_only_response_is_usable() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| {
            Ok(ProviderResponse {
                choices: vec![Choice::tool_calls(vec![ToolCall {
                    id: "call_1".into(),
                    name: "write_file".into(),
                    arguments: serde_json::json!({"path": "a.md"}),
                }])],
                usage: None,
                model: None,
            })
        }));
        let sink = Arc::new(RecordingSink::default());

        let result = invoker(&gateway, &sink)
            .invoke(AgentRole::Executor, &chain(), &request(), &None)
            .await
            .unwrap();
        assert!(result.has_tool_calls());
        assert_eq!(gateway.models_called(), vec!["primary"]);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_first_and_last() {
        let gateway = Arc::new(ScriptedGateway::new(|candidate, _| {
            Err(GatewayError::Other(format!("boom from {}", candidate.model)))
        }));
        let sink = Arc::new(RecordingSink::default());

        let err = invoker(&gateway, &sink)
            .invoke(AgentRole::Writer, &chain(), &request(), &None)
            .await
            .unwrap_err();

        match &err {
            InvokeError::Exhausted { failures } => {
                assert_eq!(failures.len(), 3);
                assert!(failures[0].message.contains("boom from primary"));
                assert!(failures[2].message.contains("boom from third"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!err.is_fatal());
        assert!(matches!(
            sink.events().last(),
            Some(RunEvent::FallbackExhausted { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_does_not_fall_back() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_, _| Ok(ProviderResponse::from_text("never")))
                .failing_init("primary", GatewayError::MissingCredential("OPENAI_API_KEY".into())),
        );
        let sink = Arc::new(RecordingSink::default());

        let err = invoker(&gateway, &sink)
            .invoke(AgentRole::Planner, &chain(), &request(), &None)
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert!(gateway.models_called().is_empty());
        assert!(sink.names().contains(&"llm_initialization_error".to_string()));
        assert!(!sink.names().contains(&"fallback_exhausted".to_string()));
    }

    #[tokio::test]
    async fn test_init_failure_falls_back() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_, _| Ok(ProviderResponse::from_text("second answered")))
                .failing_init("primary", GatewayError::ConnectionError("refused".into())),
        );
        let sink = Arc::new(RecordingSink::default());

        let result = invoker(&gateway, &sink)
            .invoke(AgentRole::Planner, &chain(), &request(), &None)
            .await
            .unwrap();
        assert_eq!(result.candidate.model, "second");
    }

    #[tokio::test]
    async fn test_cancelled_before_any_call() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| {
            Ok(ProviderResponse::from_text("never"))
        }));
        let sink = Arc::new(RecordingSink::default());
        let token = CancellationToken::new();
        token.cancel();

        let err = invoker(&gateway, &sink)
            .invoke(AgentRole::Planner, &chain(), &request(), &Some(token))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(gateway.models_called().is_empty());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_, _| Ok(ProviderResponse::from_text("late")))
                .with_delay("primary", Duration::from_millis(200)),
        );
        let sink = Arc::new(RecordingSink::default());

        let result = invoker(&gateway, &sink)
            .with_timeout(Some(Duration::from_millis(20)))
            .invoke(AgentRole::Planner, &chain(), &request(), &None)
            .await
            .unwrap();
        assert_eq!(result.candidate.model, "second");
        assert!(sink.events().iter().any(|e| matches!(
            e,
            RunEvent::LlmGenerationError {
                failure: FailureKind::Timeout,
                ..
            }
        )));
    }
}
