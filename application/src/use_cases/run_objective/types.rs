//! Type definitions for the RunObjective use case.

use crate::config::RunOptions;
use crate::ports::event_sink::{EventSink, EventSinkError};
use cadence_domain::{DomainError, FinalReport, RunEvent, TokenUsage};
use std::sync::Mutex;
use thiserror::Error;

/// Errors that end a run without a normal report.
///
/// Configuration and cancellation still carry the partial report, so the
/// caller can show what ran before the stop.
#[derive(Error, Debug)]
pub enum RunObjectiveError {
    #[error("Invalid input: {0}")]
    InvalidInput(#[from] DomainError),

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        report: Box<FinalReport>,
    },

    #[error("Run cancelled")]
    Cancelled { report: Box<FinalReport> },
}

impl RunObjectiveError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunObjectiveError::Cancelled { .. })
    }

    /// Report produced before the run stopped, if any.
    pub fn report(&self) -> Option<&FinalReport> {
        match self {
            RunObjectiveError::InvalidInput(_) => None,
            RunObjectiveError::Configuration { report, .. }
            | RunObjectiveError::Cancelled { report } => Some(report),
        }
    }
}

/// Input for the RunObjective use case
#[derive(Debug, Clone)]
pub struct RunObjectiveInput {
    /// What the run should achieve
    pub objective: String,
    /// Workspace handle (relative directory inside the workspace store)
    pub workspace: String,
    pub options: RunOptions,
}

impl RunObjectiveInput {
    pub fn new(objective: impl Into<String>, workspace: impl Into<String>, options: RunOptions) -> Self {
        Self {
            objective: objective.into(),
            workspace: workspace.into(),
            options,
        }
    }
}

/// Why the iteration loop ended early.
pub(super) enum Abort {
    Cancelled,
    Configuration(String),
}

/// Sums token usage from successful generations of one run.
#[derive(Default)]
pub(super) struct UsageTally {
    total: Mutex<TokenUsage>,
}

impl UsageTally {
    pub(super) fn total(&self) -> TokenUsage {
        self.total.lock().map(|t| *t).unwrap_or_default()
    }
}

impl EventSink for UsageTally {
    fn name(&self) -> &str {
        "usage"
    }

    fn emit(&self, event: &RunEvent) -> Result<(), EventSinkError> {
        if let RunEvent::LlmGenerationSuccess { usage, .. } = event {
            let mut total = self
                .total
                .lock()
                .map_err(|_| EventSinkError::Closed)?;
            total.accumulate(usage);
        }
        Ok(())
    }
}
