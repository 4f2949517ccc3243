//! Domain layer for cadence
//!
//! Core types and pure logic for the iterative agent pipeline. This crate
//! has no I/O and no async runtime dependency.
//!
//! # Core Concepts
//!
//! ## Fallback chains
//!
//! Every agent role calls a model through a [`FallbackChain`]: the primary
//! candidate, then same-provider fallbacks, then cross-provider fallbacks.
//! Failures are classified by [`FailureKind`] into retryable and fatal.
//!
//! ## Iterations
//!
//! A run repeats plan → execute → validate → write → critique. Each
//! iteration gets an [`IterationStrategy`] from its position in the budget,
//! and the outputs of one iteration feed the next through [`RunState`].

pub mod approval;
pub mod config;
pub mod core;
pub mod decision;
pub mod event;
pub mod fallback;
pub mod orchestration;
pub mod prompt;
pub mod session;

pub use approval::{
    ApprovalDecision, ApprovalOutcome, ApprovalPoint, ApprovalRequest, ApprovalResponse,
    GateState, HilMode,
};
pub use config::validation::{ConfigIssue, ConfigIssueCode, Severity};
pub use core::{
    candidate::{ModelCandidate, ProviderId},
    error::DomainError,
};
pub use decision::{Decision, DecisionParseError};
pub use event::{CandidateRef, RunEvent};
pub use fallback::{
    chain::{CandidateTier, CrossProviderFallback, FallbackChain, ProviderSettings},
    classification::{FailureClass, FailureKind},
};
pub use orchestration::{
    phase::{AgentRole, Phase},
    report::{FinalReport, IterationRecord, PhaseEntry, StopDecisionRecord, StopReason},
    retry::{AttemptRecord, RetryOutcome, Verdict},
    run_state::{CarriedOutputs, PhaseOutcome, RunState, WorkspaceHandle},
    strategy::{IterationStrategy, StrategyBands, StrategyKind},
};
pub use prompt::TemplateVars;
pub use session::{
    entities::{InvocationRequest, Message, Role, ToolDeclaration},
    response::{Choice, FunctionCall, InvocationResult, ProviderResponse, ToolCall},
    usage::TokenUsage,
    validation::{ValidationOutcome, ValidationReport},
};
