//! Conditional decision use case.
//!
//! Asks the decision model a yes/no question about some context and parses
//! the `{"result", "reason"}` answer. Decisions run at temperature 0 with a
//! JSON-schema response format so providers that support structured output
//! enforce the shape.

use crate::ports::prompt_builder::PromptBuilder;
use crate::use_cases::invoke_model::{InvokeError, ModelInvoker};
use cadence_domain::decision::{decision_prompt, decision_schema, parse_decision, parse_decision_value};
use cadence_domain::{AgentRole, Decision, DecisionParseError, FallbackChain, InvocationRequest, TemplateVars};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DecisionError {
    #[error("Decision model failed: {0}")]
    Invoke(#[from] InvokeError),

    #[error("Decision output unusable: {0}")]
    Parse(#[from] DecisionParseError),
}

impl DecisionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DecisionError::Invoke(e) if e.is_cancelled())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DecisionError::Invoke(e) if e.is_configuration())
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, DecisionError::Invoke(e) if e.is_fatal())
    }
}

pub struct ConditionalDecision {
    invoker: ModelInvoker,
    prompts: Arc<dyn PromptBuilder>,
}

impl ConditionalDecision {
    pub fn new(invoker: ModelInvoker, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self { invoker, prompts }
    }

    pub async fn decide(
        &self,
        context: &str,
        question: &str,
        chain: &FallbackChain,
        cancellation_token: &Option<CancellationToken>,
    ) -> Result<Decision, DecisionError> {
        let system = self.prompts.build(AgentRole::Decision, &TemplateVars::new()).system;
        let request = InvocationRequest::prompt(system.as_deref(), decision_prompt(context, question))
            .with_temperature(0.0)
            .with_extra(
                "response_format",
                serde_json::json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": "decision",
                        "strict": true,
                        "schema": decision_schema(),
                    }
                }),
            );

        let result = self
            .invoker
            .invoke(AgentRole::Decision, chain, &request, cancellation_token)
            .await?;

        let decision = if !result.content.trim().is_empty() {
            parse_decision(&result.content)?
        } else {
            let call = result
                .tool_calls
                .into_iter()
                .next()
                .ok_or(DecisionParseError::NoJsonObject)?;
            parse_decision_value(call.arguments)?
        };

        debug!("Decision: {} ({})", decision.result, decision.reason);
        Ok(decision)
    }
}
