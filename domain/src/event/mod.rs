//! Lifecycle events emitted during a run.
//!
//! Events are facts for observers (JSONL transcripts, tracing, dashboards).
//! Nothing in the pipeline depends on whether an event was delivered.

use crate::core::candidate::ProviderId;
use crate::fallback::chain::CandidateTier;
use crate::fallback::classification::FailureKind;
use crate::orchestration::phase::{AgentRole, Phase};
use crate::orchestration::report::StopReason;
use crate::orchestration::strategy::StrategyKind;
use crate::session::usage::TokenUsage;
use serde::{Deserialize, Serialize};

/// Which candidate a model-call event refers to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRef {
    pub role: AgentRole,
    pub provider: ProviderId,
    pub model: String,
    /// 0-based position in the chain.
    pub position: usize,
    pub tier: CandidateTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        run_id: String,
        objective: String,
        workspace: String,
        max_iterations: u32,
    },
    IterationStarted {
        run_id: String,
        iteration: u32,
        strategy: StrategyKind,
        strategy_name: String,
    },
    PhaseCompleted {
        run_id: String,
        iteration: u32,
        phase: Phase,
        degraded: bool,
        attempts: u32,
    },
    StopDecision {
        run_id: String,
        iteration: u32,
        result: Option<bool>,
        reason: String,
    },
    ApprovalRequested {
        request_id: String,
        attempt: u32,
    },
    ApprovalResolved {
        request_id: String,
        approved: bool,
    },
    LlmInitializationStart {
        #[serde(flatten)]
        candidate: CandidateRef,
    },
    LlmInitializationSuccess {
        #[serde(flatten)]
        candidate: CandidateRef,
    },
    LlmInitializationError {
        #[serde(flatten)]
        candidate: CandidateRef,
        error: String,
        failure: FailureKind,
    },
    LlmGenerationStart {
        #[serde(flatten)]
        candidate: CandidateRef,
        messages: usize,
    },
    LlmGenerationSuccess {
        #[serde(flatten)]
        candidate: CandidateRef,
        usage: TokenUsage,
        duration_ms: u64,
        content_bytes: usize,
        tool_calls: usize,
    },
    LlmGenerationError {
        #[serde(flatten)]
        candidate: CandidateRef,
        error: String,
        failure: FailureKind,
        duration_ms: u64,
    },
    FallbackExhausted {
        role: AgentRole,
        attempts: usize,
        first_error: String,
        last_error: String,
    },
    RunCompleted {
        run_id: String,
        iterations: u32,
        stop_reason: StopReason,
        duration_ms: u64,
    },
}

impl RunEvent {
    /// Event type identifier, as written in the `type` field.
    pub fn name(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "run_started",
            RunEvent::IterationStarted { .. } => "iteration_started",
            RunEvent::PhaseCompleted { .. } => "phase_completed",
            RunEvent::StopDecision { .. } => "stop_decision",
            RunEvent::ApprovalRequested { .. } => "approval_requested",
            RunEvent::ApprovalResolved { .. } => "approval_resolved",
            RunEvent::LlmInitializationStart { .. } => "llm_initialization_start",
            RunEvent::LlmInitializationSuccess { .. } => "llm_initialization_success",
            RunEvent::LlmInitializationError { .. } => "llm_initialization_error",
            RunEvent::LlmGenerationStart { .. } => "llm_generation_start",
            RunEvent::LlmGenerationSuccess { .. } => "llm_generation_success",
            RunEvent::LlmGenerationError { .. } => "llm_generation_error",
            RunEvent::FallbackExhausted { .. } => "fallback_exhausted",
            RunEvent::RunCompleted { .. } => "run_completed",
        }
    }

    pub fn candidate(&self) -> Option<&CandidateRef> {
        match self {
            RunEvent::LlmInitializationStart { candidate }
            | RunEvent::LlmInitializationSuccess { candidate }
            | RunEvent::LlmInitializationError { candidate, .. }
            | RunEvent::LlmGenerationStart { candidate, .. }
            | RunEvent::LlmGenerationSuccess { candidate, .. }
            | RunEvent::LlmGenerationError { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            RunEvent::LlmInitializationError { .. }
                | RunEvent::LlmGenerationError { .. }
                | RunEvent::FallbackExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> CandidateRef {
        CandidateRef {
            role: AgentRole::Planner,
            provider: ProviderId::OpenRouter,
            model: "moonshotai/kimi-k2".to_string(),
            position: 1,
            tier: CandidateTier::SameProvider,
        }
    }

    #[test]
    fn test_generation_success_serializes_flat() {
        let event = RunEvent::LlmGenerationSuccess {
            candidate: candidate(),
            usage: TokenUsage::new(100, 20, None).with_reasoning_tokens(Some(5)),
            duration_ms: 42,
            content_bytes: 10,
            tool_calls: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], event.name());
        assert_eq!(json["provider"], "openrouter");
        assert_eq!(json["model"], "moonshotai/kimi-k2");
        assert_eq!(json["tier"], "same_provider");
        assert_eq!(json["usage"]["total_tokens"], 120);
        assert_eq!(json["usage"]["reasoning_tokens"], 5);
    }

    #[test]
    fn test_error_event_carries_failure_kind() {
        let event = RunEvent::LlmGenerationError {
            candidate: candidate(),
            error: "HTTP 429".to_string(),
            failure: FailureKind::RateLimited,
            duration_ms: 3,
        };
        assert!(event.is_error());
        assert_eq!(event.candidate().map(|c| c.position), Some(1));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["failure"]["kind"], "rate_limited");
    }

    #[test]
    fn test_run_events_have_no_candidate() {
        let event = RunEvent::StopDecision {
            run_id: "r".to_string(),
            iteration: 2,
            result: None,
            reason: "decision failed".to_string(),
        };
        assert!(event.candidate().is_none());
        assert!(!event.is_error());
    }
}
