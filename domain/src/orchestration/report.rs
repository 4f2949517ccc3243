//! Final run report.
//!
//! Every executed iteration contributes one entry per phase, including
//! degraded ones, so a reader can see exactly what went wrong where.

use crate::approval::ApprovalOutcome;
use crate::orchestration::phase::Phase;
use crate::orchestration::run_state::PhaseOutcome;
use crate::orchestration::strategy::StrategyKind;
use crate::session::usage::TokenUsage;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One phase row of the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseEntry {
    pub phase: Phase,
    pub outcome: PhaseOutcome,
    /// Attempts used (retry loops report more than 1).
    pub attempts: u32,
    /// Workspace path the output was written to, when the write succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Non-fatal problems, e.g. a failed workspace write.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl PhaseEntry {
    pub fn new(phase: Phase, outcome: PhaseOutcome) -> Self {
        Self {
            phase,
            outcome,
            attempts: 1,
            artifact: None,
            notes: Vec::new(),
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.outcome.is_degraded()
    }
}

/// Result of the stopping oracle for one iteration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopDecisionRecord {
    /// `None` when the decision call failed and the run continued.
    pub result: Option<bool>,
    pub rationale: String,
}

impl StopDecisionRecord {
    pub fn decided(result: bool, rationale: impl Into<String>) -> Self {
        Self {
            result: Some(result),
            rationale: rationale.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            result: None,
            rationale: format!("decision failed, continuing: {}", error.into()),
        }
    }

    pub fn should_stop(&self) -> bool {
        self.result == Some(true)
    }
}

/// Everything that happened in one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: u32,
    pub strategy: StrategyKind,
    pub strategy_name: String,
    pub phases: Vec<PhaseEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_decision: Option<StopDecisionRecord>,
}

impl IterationRecord {
    pub fn degraded_count(&self) -> usize {
        self.phases.iter().filter(|p| p.is_degraded()).count()
    }

    pub fn phase(&self, phase: Phase) -> Option<&PhaseEntry> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum StopReason {
    ObjectiveMet { iteration: u32 },
    IterationsExhausted { iterations: u32 },
    Cancelled { iteration: u32 },
    ConfigurationError { message: String },
}

/// Report produced by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalReport {
    pub run_id: String,
    pub objective: String,
    pub workspace: String,
    pub started_at: String,
    pub duration_ms: u64,
    pub iterations: Vec<IterationRecord>,
    pub stop_reason: StopReason,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approvals: Vec<ApprovalOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup: Option<PhaseEntry>,
    pub usage: TokenUsage,
}

impl FinalReport {
    pub fn iteration_count(&self) -> usize {
        self.iterations.len()
    }

    pub fn degraded_count(&self) -> usize {
        self.iterations.iter().map(|i| i.degraded_count()).sum::<usize>()
            + usize::from(self.cleanup.as_ref().is_some_and(|c| c.is_degraded()))
    }

    pub fn objective_met(&self) -> bool {
        matches!(self.stop_reason, StopReason::ObjectiveMet { .. })
    }

    /// Output of `phase` from the last iteration that ran it.
    pub fn latest_output(&self, phase: Phase) -> Option<&str> {
        self.iterations
            .iter()
            .rev()
            .find_map(|i| i.phase(phase))
            .map(|p| p.outcome.text())
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# Run Report\n");
        let _ = writeln!(out, "**Objective**: {}\n", self.objective);
        let _ = writeln!(out, "**Workspace**: {}", self.workspace);
        let _ = writeln!(out, "**Started**: {}", self.started_at);
        let _ = writeln!(
            out,
            "**Duration**: {:.1}s",
            self.duration_ms as f64 / 1000.0
        );
        let _ = writeln!(out, "**Outcome**: {}", self.stop_reason);
        let _ = writeln!(
            out,
            "**Tokens**: {} in / {} out / {} total\n",
            self.usage.input_tokens, self.usage.output_tokens, self.usage.total_tokens
        );

        for approval in &self.approvals {
            let status = if approval.approved {
                "approved".to_string()
            } else {
                format!("not approved after {} revision(s)", approval.requests)
            };
            let _ = writeln!(out, "**Approval ({})**: {}", approval.kind, status);
        }
        if !self.approvals.is_empty() {
            out.push('\n');
        }

        for iteration in &self.iterations {
            let _ = writeln!(
                out,
                "## Iteration {}: {}\n",
                iteration.iteration, iteration.strategy_name
            );
            for entry in &iteration.phases {
                write_phase(&mut out, entry);
            }
            if let Some(decision) = &iteration.stop_decision {
                let verdict = match decision.result {
                    Some(true) => "stop",
                    Some(false) => "continue",
                    None => "continue (decision error)",
                };
                let _ = writeln!(out, "**Stop decision**: {} ({})\n", verdict, decision.rationale);
            }
        }

        if let Some(cleanup) = &self.cleanup {
            let _ = writeln!(out, "## Cleanup\n");
            write_phase(&mut out, cleanup);
        }
        out
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::ObjectiveMet { iteration } => {
                write!(f, "objective met at iteration {}", iteration)
            }
            StopReason::IterationsExhausted { iterations } => {
                write!(f, "iteration budget exhausted after {}", iterations)
            }
            StopReason::Cancelled { iteration } => {
                write!(f, "cancelled during iteration {}", iteration)
            }
            StopReason::ConfigurationError { message } => {
                write!(f, "aborted by configuration error: {}", message)
            }
        }
    }
}

fn write_phase(out: &mut String, entry: &PhaseEntry) {
    let marker = if entry.is_degraded() { " [DEGRADED]" } else { "" };
    let _ = write!(out, "### {}{}", entry.phase.title(), marker);
    if entry.attempts > 1 {
        let _ = write!(out, " ({} attempts)", entry.attempts);
    }
    let _ = writeln!(out, "\n");
    let _ = writeln!(out, "{}\n", entry.outcome.text().trim_end());
    if let Some(path) = &entry.artifact {
        let _ = writeln!(out, "_Saved to `{}`_\n", path);
    }
    for note in &entry.notes {
        let _ = writeln!(out, "> {}\n", note);
    }
}
