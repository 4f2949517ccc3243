//! Run Objective use case
//!
//! Drives the iterative pipeline for one objective:
//!
//! | Step              | Runs                                         |
//! |-------------------|----------------------------------------------|
//! | 1. Planning       | every iteration; approval gate per setting   |
//! | 2. Execution      | every iteration; judged against the plan     |
//! | 3. Validation     | every iteration                              |
//! | 4. Writing        | every iteration                              |
//! | 5. Critique       | every iteration                              |
//! | 6. Stop decision  | every iteration; strategy's stopping question|
//! | 7. Cleanup        | once, after the loop                         |
//!
//! A phase whose models all fail is recorded as degraded and the loop goes
//! on. Configuration errors and cancellation end the loop early; cleanup
//! and the report still happen.

mod phases;
mod types;

pub use types::{RunObjectiveError, RunObjectiveInput};

use crate::ports::event_sink::{EventFanout, EventSink};
use crate::ports::human_channel::HumanChannel;
use crate::ports::llm_gateway::LlmGateway;
use crate::ports::progress::{NoRunProgress, RunProgressNotifier};
use crate::ports::prompt_builder::{PromptBuilder, SectionPromptBuilder};
use crate::ports::workspace::WorkspaceStore;
use crate::use_cases::agent_step::AgentStep;
use crate::use_cases::approval_gate::ApprovalGate;
use crate::use_cases::decide::ConditionalDecision;
use crate::use_cases::invoke_model::ModelInvoker;
use crate::use_cases::shared::{is_cancelled, now_nanos};
use cadence_domain::{
    FinalReport, RunEvent, RunState, StopReason, TokenUsage, WorkspaceHandle,
};
use phases::PhaseRunner;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use types::{Abort, UsageTally};

/// Use case for running one objective to completion
pub struct RunObjectiveUseCase {
    gateway: Arc<dyn LlmGateway>,
    workspace: Arc<dyn WorkspaceStore>,
    prompts: Arc<dyn PromptBuilder>,
    events: EventFanout,
    human_channel: Option<Arc<dyn HumanChannel>>,
    cancellation_token: Option<CancellationToken>,
    timeout: Option<Duration>,
}

impl Clone for RunObjectiveUseCase {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            workspace: self.workspace.clone(),
            prompts: self.prompts.clone(),
            events: self.events.clone(),
            human_channel: self.human_channel.clone(),
            cancellation_token: self.cancellation_token.clone(),
            timeout: self.timeout,
        }
    }
}

impl RunObjectiveUseCase {
    pub fn new(gateway: Arc<dyn LlmGateway>, workspace: Arc<dyn WorkspaceStore>) -> Self {
        Self {
            gateway,
            workspace,
            prompts: Arc::new(SectionPromptBuilder),
            events: EventFanout::default(),
            human_channel: None,
            cancellation_token: None,
            timeout: None,
        }
    }

    pub fn with_prompt_builder(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = self.events.with_sink(sink);
        self
    }

    /// Set the reviewer for approval gates. Without one, gates are skipped.
    pub fn with_human_channel(mut self, channel: Arc<dyn HumanChannel>) -> Self {
        self.human_channel = Some(channel);
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Bound each model call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn execute(&self, input: RunObjectiveInput) -> Result<FinalReport, RunObjectiveError> {
        self.execute_with_progress(input, &NoRunProgress).await
    }

    pub async fn execute_with_progress(
        &self,
        input: RunObjectiveInput,
        progress: &dyn RunProgressNotifier,
    ) -> Result<FinalReport, RunObjectiveError> {
        let RunObjectiveInput {
            objective,
            workspace,
            options,
        } = input;

        // Validated before any model is contacted.
        let handle = WorkspaceHandle::new(workspace)?;
        let mut state = RunState::new(objective, handle, options.max_iterations)?;

        let run_id = format!("run_{}", now_nanos());
        let started_at = chrono::Utc::now();
        let clock = Instant::now();

        let tally = Arc::new(UsageTally::default());
        let events = self.events.clone().with_sink(tally.clone());
        let invoker = ModelInvoker::new(self.gateway.clone())
            .with_events(events.clone())
            .with_timeout(self.timeout);

        let gate = match &self.human_channel {
            Some(channel) => Some(
                ApprovalGate::new(channel.clone())
                    .with_max_revisions(options.max_approval_revisions)
                    .with_events(events.clone()),
            ),
            None => {
                info!("No human channel configured; approval gates are skipped");
                None
            }
        };

        let runner = PhaseRunner {
            run_id: run_id.clone(),
            options: &options,
            step: AgentStep::new(invoker.clone(), self.prompts.clone())
                .with_generation(options.generation),
            decision: ConditionalDecision::new(invoker, self.prompts.clone()),
            gate,
            workspace: self.workspace.clone(),
            events: events.clone(),
            progress,
            cancellation_token: self.cancellation_token.clone(),
            cleanup_limit: self.timeout,
        };

        info!(
            "Starting run {} in '{}' (max {} iterations)",
            run_id,
            state.workspace.as_str(),
            state.max_iterations
        );
        events.publish(&RunEvent::RunStarted {
            run_id: run_id.clone(),
            objective: state.objective.clone(),
            workspace: state.workspace.as_str().to_string(),
            max_iterations: state.max_iterations,
        });

        let mut iterations = Vec::new();
        let mut approvals = Vec::new();
        let mut abort: Option<Abort> = None;
        let mut stopped_at: Option<u32> = None;

        while state.begin_iteration() {
            if is_cancelled(&self.cancellation_token) {
                abort = Some(Abort::Cancelled);
                break;
            }
            let strategy = options.bands.select(state.iteration, state.max_iterations);
            info!(
                "Iteration {}/{}: {}",
                state.iteration, state.max_iterations, strategy.name
            );
            events.publish(&RunEvent::IterationStarted {
                run_id: run_id.clone(),
                iteration: state.iteration,
                strategy: strategy.kind,
                strategy_name: strategy.name.to_string(),
            });
            progress.on_iteration_start(state.iteration, state.max_iterations, &strategy);

            let (record, early_exit) = runner
                .run_iteration(&mut state, &strategy, &mut approvals)
                .await;
            let stop = record
                .stop_decision
                .as_ref()
                .is_some_and(|d| d.should_stop());
            iterations.push(record);

            if early_exit.is_some() {
                abort = early_exit;
                break;
            }
            if stop {
                stopped_at = Some(state.iteration);
                break;
            }
        }

        let stop_reason = match (&abort, stopped_at) {
            (Some(Abort::Cancelled), _) => StopReason::Cancelled {
                iteration: state.iteration,
            },
            (Some(Abort::Configuration(message)), _) => StopReason::ConfigurationError {
                message: message.clone(),
            },
            (None, Some(iteration)) => StopReason::ObjectiveMet { iteration },
            (None, None) => StopReason::IterationsExhausted {
                iterations: state.iteration,
            },
        };

        let mut report = FinalReport {
            run_id: run_id.clone(),
            objective: state.objective.clone(),
            workspace: state.workspace.as_str().to_string(),
            started_at: started_at.to_rfc3339(),
            duration_ms: 0,
            iterations,
            stop_reason,
            approvals,
            cleanup: None,
            usage: TokenUsage::default(),
        };

        let cleanup = runner.cleanup(&state, report.to_markdown()).await;
        report.cleanup = Some(cleanup);
        report.usage = tally.total();
        report.duration_ms = clock.elapsed().as_millis() as u64;

        let report_path = format!("{}/{}", state.workspace.as_str(), WorkspaceHandle::report_path());
        if let Err(e) = self
            .workspace
            .write(&report_path, report.to_markdown().as_bytes())
            .await
        {
            warn!("Failed to write run report {}: {}", report_path, e);
        }

        events.publish(&RunEvent::RunCompleted {
            run_id,
            iterations: report.iteration_count() as u32,
            stop_reason: report.stop_reason.clone(),
            duration_ms: report.duration_ms,
        });
        progress.on_run_complete(&report);
        info!(
            "Run finished after {} iteration(s): {:?}",
            report.iteration_count(),
            report.stop_reason
        );

        match abort {
            Some(Abort::Cancelled) => Err(RunObjectiveError::Cancelled {
                report: Box::new(report),
            }),
            Some(Abort::Configuration(message)) => Err(RunObjectiveError::Configuration {
                message,
                report: Box::new(report),
            }),
            None => Ok(report),
        }
    }
}

#[cfg(test)]
mod tests;
