//! Application layer for cadence
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{GenerationParams, RoleChains, RunOptions};
pub use ports::{
    event_sink::{EventFanout, EventSink, EventSinkError, NoEventSink},
    human_channel::{AutoApproveChannel, AutoReviseChannel, HumanChannel, HumanChannelError},
    llm_gateway::{GatewayError, LlmGateway, LlmSession},
    progress::{CompositeRunProgress, NoRunProgress, RunProgressNotifier},
    prompt_builder::{Prompt, PromptBuilder, SectionPromptBuilder},
    workspace::{InMemoryWorkspace, WorkspaceError, WorkspaceStore},
};
pub use use_cases::agent_step::{AgentStep, StepError, StepOutput};
pub use use_cases::approval_gate::{ApprovalError, ApprovalGate, ArtifactReviser};
pub use use_cases::decide::{ConditionalDecision, DecisionError};
pub use use_cases::invoke_model::{CandidateFailure, InvokeError, ModelInvoker};
pub use use_cases::retry_feedback::{AttemptJudge, AttemptProducer, RetryWithFeedback};
pub use use_cases::run_objective::{RunObjectiveError, RunObjectiveInput, RunObjectiveUseCase};
