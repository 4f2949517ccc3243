//! One agent step: build the prompt for a role, invoke, return the output.

use crate::config::GenerationParams;
use crate::ports::prompt_builder::PromptBuilder;
use crate::use_cases::decide::DecisionError;
use crate::use_cases::invoke_model::{InvokeError, ModelInvoker};
use cadence_domain::{
    AgentRole, FallbackChain, InvocationRequest, ModelCandidate, TemplateVars, TokenUsage, ToolCall,
};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error("No attempt produced output after {attempts} attempt(s): {feedback}")]
    NoOutput { attempts: u32, feedback: String },
}

impl StepError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            StepError::Invoke(e) => e.is_cancelled(),
            StepError::Decision(e) => e.is_cancelled(),
            StepError::NoOutput { .. } => false,
        }
    }

    pub fn is_configuration(&self) -> bool {
        match self {
            StepError::Invoke(e) => e.is_configuration(),
            StepError::Decision(e) => e.is_configuration(),
            StepError::NoOutput { .. } => false,
        }
    }

    /// Errors that must abort the run instead of degrading a phase.
    pub fn is_fatal(&self) -> bool {
        self.is_cancelled() || self.is_configuration()
    }
}

/// Output of a successful step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub text: String,
    /// Structured payload, when the model answered with tool calls.
    pub tool_calls: Vec<ToolCall>,
    pub candidate: ModelCandidate,
    pub usage: TokenUsage,
}

impl StepOutput {
    /// Text to carry forward. Tool-call-only answers are rendered as JSON.
    pub fn rendered(&self) -> String {
        if !self.text.trim().is_empty() || self.tool_calls.is_empty() {
            return self.text.clone();
        }
        serde_json::to_string_pretty(&self.tool_calls).unwrap_or_default()
    }
}

pub struct AgentStep {
    invoker: ModelInvoker,
    prompts: Arc<dyn PromptBuilder>,
    generation: GenerationParams,
}

impl AgentStep {
    pub fn new(invoker: ModelInvoker, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self {
            invoker,
            prompts,
            generation: GenerationParams::default(),
        }
    }

    pub fn with_generation(mut self, generation: GenerationParams) -> Self {
        self.generation = generation;
        self
    }

    pub async fn run(
        &self,
        role: AgentRole,
        vars: &TemplateVars,
        chain: &FallbackChain,
        cancellation_token: &Option<CancellationToken>,
    ) -> Result<StepOutput, StepError> {
        let prompt = self.prompts.build(role, vars);
        let mut request = InvocationRequest::prompt(prompt.system.as_deref(), prompt.user);
        if let Some(temperature) = self.generation.temperature {
            request = request.with_temperature(temperature);
        }
        if let Some(max) = self.generation.max_output_tokens {
            request = request.with_max_output_tokens(max);
        }

        let result = self
            .invoker
            .invoke(role, chain, &request, cancellation_token)
            .await?;

        Ok(StepOutput {
            text: result.content,
            tool_calls: result.tool_calls,
            candidate: result.candidate,
            usage: result.usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use crate::ports::prompt_builder::SectionPromptBuilder;
    use crate::use_cases::testing::ScriptedGateway;
    use cadence_domain::prompt::keys;
    use cadence_domain::{Choice, ProviderId, ProviderResponse};

    fn chain() -> FallbackChain {
        FallbackChain::builder(ProviderId::Vertex, "gemini-2.5-flash")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_step_applies_prompt_and_generation_params() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| {
            Ok(ProviderResponse::from_text("1. Read files\n2. Summarize"))
        }));
        let step = AgentStep::new(ModelInvoker::new(gateway.clone()), Arc::new(SectionPromptBuilder))
            .with_generation(GenerationParams {
                temperature: Some(0.4),
                max_output_tokens: Some(512),
            });
        let vars = TemplateVars::new().with(keys::OBJECTIVE, "Summarize the repo");

        let output = step.run(AgentRole::Planner, &vars, &chain(), &None).await.unwrap();

        assert_eq!(output.rendered(), "1. Read files\n2. Summarize");
        let call = &gateway.calls()[0];
        assert!(call.system.contains("planning agent"));
        assert!(call.user.contains("Summarize the repo"));
        assert_eq!(call.temperature, Some(0.4));
    }

    #[tokio::test]
    async fn test_tool_call_output_is_rendered() {
        let gateway = Arc::new(ScriptedGateway::new(|_, _| {
            Ok(ProviderResponse {
                choices: vec![Choice::tool_calls(vec![ToolCall {
                    id: "c1".into(),
                    name: "write_file".into(),
                    arguments: serde_json::json!({"path": "notes.md"}),
                }])],
                usage: None,
                model: None,
            })
        }));
        let step = AgentStep::new(ModelInvoker::new(gateway), Arc::new(SectionPromptBuilder));

        let output = step
            .run(AgentRole::Executor, &TemplateVars::new(), &chain(), &None)
            .await
            .unwrap();
        assert!(output.rendered().contains("write_file"));
    }

    #[tokio::test]
    async fn test_configuration_error_is_fatal() {
        let gateway = Arc::new(
            ScriptedGateway::new(|_, _| Ok(ProviderResponse::from_text("x")))
                .failing_init("gemini-2.5-flash", GatewayError::UnknownProvider("vertex".into())),
        );
        let step = AgentStep::new(ModelInvoker::new(gateway), Arc::new(SectionPromptBuilder));

        let err = step
            .run(AgentRole::Executor, &TemplateVars::new(), &chain(), &None)
            .await
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.is_fatal());
    }
}
