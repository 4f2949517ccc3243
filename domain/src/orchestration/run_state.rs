//! Per-run mutable state owned by the orchestrator.

use crate::core::error::DomainError;
use crate::orchestration::phase::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to the workspace a run reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceHandle(String);

impl WorkspaceHandle {
    pub fn new(handle: impl Into<String>) -> Result<Self, DomainError> {
        let handle = handle.into();
        let trimmed = handle.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidWorkspace(
                "workspace handle is empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path for a phase artifact of one iteration, relative to the workspace.
    pub fn artifact_path(iteration: u32, phase: Phase) -> String {
        format!("iteration-{}/{}.md", iteration, phase.as_str())
    }

    pub fn report_path() -> &'static str {
        "report.md"
    }
}

impl fmt::Display for WorkspaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What one phase produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PhaseOutcome {
    Completed { text: String },
    /// The phase failed; `placeholder` is passed downstream instead.
    Degraded { placeholder: String, reason: String },
}

impl PhaseOutcome {
    pub fn completed(text: impl Into<String>) -> Self {
        PhaseOutcome::Completed { text: text.into() }
    }

    pub fn degraded(phase: Phase, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        PhaseOutcome::Degraded {
            placeholder: phase.placeholder(&reason),
            reason,
        }
    }

    /// Text handed to the next phase.
    pub fn text(&self) -> &str {
        match self {
            PhaseOutcome::Completed { text } => text,
            PhaseOutcome::Degraded { placeholder, .. } => placeholder,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, PhaseOutcome::Degraded { .. })
    }
}

/// Outputs carried from one iteration into the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedOutputs {
    pub plan: Option<String>,
    pub execution: Option<String>,
    pub validation: Option<String>,
    pub writing: Option<String>,
    pub critique: Option<String>,
}

impl CarriedOutputs {
    pub fn get(&self, phase: Phase) -> Option<&str> {
        match phase {
            Phase::Planning => self.plan.as_deref(),
            Phase::Execution => self.execution.as_deref(),
            Phase::Validation => self.validation.as_deref(),
            Phase::Writing => self.writing.as_deref(),
            Phase::Critique => self.critique.as_deref(),
            Phase::Cleanup => None,
        }
    }

    pub fn set(&mut self, phase: Phase, text: impl Into<String>) {
        let slot = match phase {
            Phase::Planning => &mut self.plan,
            Phase::Execution => &mut self.execution,
            Phase::Validation => &mut self.validation,
            Phase::Writing => &mut self.writing,
            Phase::Critique => &mut self.critique,
            Phase::Cleanup => return,
        };
        *slot = Some(text.into());
    }
}

/// State of one run (Entity). Owned by exactly one orchestrator.
#[derive(Debug, Clone)]
pub struct RunState {
    pub objective: String,
    pub workspace: WorkspaceHandle,
    pub iteration: u32,
    pub max_iterations: u32,
    /// Outputs of the iteration in progress.
    pub current: CarriedOutputs,
    /// Outputs of the last finished iteration.
    pub previous: CarriedOutputs,
}

impl RunState {
    pub fn new(
        objective: impl Into<String>,
        workspace: WorkspaceHandle,
        max_iterations: u32,
    ) -> Result<Self, DomainError> {
        let objective = objective.into();
        if objective.trim().is_empty() {
            return Err(DomainError::InvalidObjective(
                "objective is empty".to_string(),
            ));
        }
        Ok(Self {
            objective,
            workspace,
            iteration: 0,
            max_iterations: max_iterations.max(1),
            current: CarriedOutputs::default(),
            previous: CarriedOutputs::default(),
        })
    }

    /// Advance to the next iteration. Returns `false` once the budget is spent.
    pub fn begin_iteration(&mut self) -> bool {
        if self.iteration >= self.max_iterations {
            return false;
        }
        if self.iteration > 0 {
            self.previous = std::mem::take(&mut self.current);
        }
        self.iteration += 1;
        true
    }

    pub fn record(&mut self, phase: Phase, outcome: &PhaseOutcome) {
        self.current.set(phase, outcome.text());
    }

    /// Latest output for `phase`: this iteration's if present, else the previous one.
    pub fn latest(&self, phase: Phase) -> Option<&str> {
        self.current.get(phase).or_else(|| self.previous.get(phase))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_handle_rejects_blank() {
        assert!(WorkspaceHandle::new("  ").is_err());
        assert_eq!(WorkspaceHandle::new(" runs/a ").unwrap().as_str(), "runs/a");
        assert_eq!(
            WorkspaceHandle::artifact_path(2, Phase::Critique),
            "iteration-2/critique.md"
        );
    }

    #[test]
    fn test_degraded_outcome_text_is_placeholder() {
        let outcome = PhaseOutcome::degraded(Phase::Execution, "timeout");
        assert!(outcome.is_degraded());
        assert_eq!(outcome.text(), "Execution phase failed: timeout");
    }

    #[test]
    fn test_iterations_carry_outputs_forward() {
        let ws = WorkspaceHandle::new("ws").unwrap();
        let mut state = RunState::new("ship it", ws, 2).unwrap();

        assert!(state.begin_iteration());
        state.record(Phase::Planning, &PhaseOutcome::completed("plan v1"));
        state.record(Phase::Critique, &PhaseOutcome::completed("needs tests"));
        assert_eq!(state.latest(Phase::Planning), Some("plan v1"));

        assert!(state.begin_iteration());
        assert_eq!(state.iteration, 2);
        assert_eq!(state.previous.critique.as_deref(), Some("needs tests"));
        assert_eq!(state.current.plan, None);
        assert_eq!(state.latest(Phase::Planning), Some("plan v1"));

        assert!(!state.begin_iteration());
        assert_eq!(state.iteration, 2);
    }

    #[test]
    fn test_blank_objective_rejected() {
        let ws = WorkspaceHandle::new("ws").unwrap();
        assert!(matches!(
            RunState::new(" ", ws, 3),
            Err(DomainError::InvalidObjective(_))
        ));
    }
}
