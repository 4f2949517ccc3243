//! Phase execution for one run.
//!
//! [`PhaseRunner`] owns the per-run components (invoker, steps, decision,
//! gate) and runs one iteration at a time against the shared [`RunState`].

use super::types::Abort;
use crate::config::RunOptions;
use crate::ports::event_sink::EventFanout;
use crate::ports::progress::RunProgressNotifier;
use crate::ports::workspace::WorkspaceStore;
use crate::use_cases::agent_step::{AgentStep, StepError, StepOutput};
use crate::use_cases::approval_gate::{ApprovalError, ApprovalGate, ArtifactReviser};
use crate::use_cases::decide::ConditionalDecision;
use crate::use_cases::invoke_model::InvokeError;
use crate::use_cases::retry_feedback::{AttemptJudge, AttemptProducer, RetryWithFeedback};
use crate::use_cases::shared::is_cancelled;
use async_trait::async_trait;
use cadence_domain::core::string::headline;
use cadence_domain::prompt::keys;
use cadence_domain::{
    AgentRole, ApprovalOutcome, IterationRecord, IterationStrategy, Phase, PhaseEntry, PhaseOutcome,
    RunEvent, RunState, StopDecisionRecord, TemplateVars, Verdict, WorkspaceHandle,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const PLAN_APPROVAL: &str = "plan_approval";

/// Upper bound on cleanup after a cancelled run with no call timeout.
const CLEANUP_GRACE: Duration = Duration::from_secs(60);

const EXECUTION_QUESTION: &str =
    "Does the execution output satisfy the success criteria the plan sets for this iteration?";

/// Result of a phase body before it is turned into a report entry.
struct PhaseResult {
    text: String,
    attempts: u32,
    notes: Vec<String>,
}

impl PhaseResult {
    fn single(text: String) -> Self {
        Self {
            text,
            attempts: 1,
            notes: Vec::new(),
        }
    }
}

pub(super) struct PhaseRunner<'a> {
    pub(super) run_id: String,
    pub(super) options: &'a RunOptions,
    pub(super) step: AgentStep,
    pub(super) decision: ConditionalDecision,
    pub(super) gate: Option<ApprovalGate>,
    pub(super) workspace: Arc<dyn WorkspaceStore>,
    pub(super) events: EventFanout,
    pub(super) progress: &'a dyn RunProgressNotifier,
    pub(super) cancellation_token: Option<CancellationToken>,
    pub(super) cleanup_limit: Option<Duration>,
}

impl PhaseRunner<'_> {
    /// Run the five iteration phases and the stop decision.
    ///
    /// Returns the iteration record (possibly partial) and, when the loop
    /// must end early, why.
    pub(super) async fn run_iteration(
        &self,
        state: &mut RunState,
        strategy: &IterationStrategy,
        approvals: &mut Vec<ApprovalOutcome>,
    ) -> (IterationRecord, Option<Abort>) {
        let iteration = state.iteration;
        let mut record = IterationRecord {
            iteration,
            strategy: strategy.kind,
            strategy_name: strategy.name.to_string(),
            phases: Vec::new(),
            stop_decision: None,
        };

        for phase in Phase::ITERATION {
            if is_cancelled(&self.cancellation_token) {
                return (record, Some(Abort::Cancelled));
            }
            self.progress.on_phase_start(iteration, phase);

            let result = match phase {
                Phase::Planning => self.planning(state, strategy, approvals).await,
                Phase::Execution => self.execution(state, strategy).await,
                _ => self.single_step(phase, state, strategy).await,
            };

            let (outcome, attempts, mut notes) = match result {
                Ok(result) => (PhaseOutcome::completed(result.text), result.attempts, result.notes),
                Err(e) if e.is_cancelled() => return (record, Some(Abort::Cancelled)),
                Err(e) if e.is_configuration() => {
                    return (record, Some(Abort::Configuration(e.to_string())));
                }
                Err(e) => {
                    warn!("{} phase degraded in iteration {}: {}", phase, iteration, e);
                    let attempts = match &e {
                        StepError::NoOutput { attempts, .. } => *attempts,
                        _ => 1,
                    };
                    (PhaseOutcome::degraded(phase, e.to_string()), attempts, Vec::new())
                }
            };

            state.record(phase, &outcome);
            let path = format!(
                "{}/{}",
                state.workspace.as_str(),
                WorkspaceHandle::artifact_path(iteration, phase)
            );
            let artifact = match self.workspace.write(&path, outcome.text().as_bytes()).await {
                Ok(()) => Some(path),
                Err(e) => {
                    warn!("Failed to write {}: {}", path, e);
                    notes.push(format!("artifact not written: {}", e));
                    None
                }
            };

            let mut entry = PhaseEntry::new(phase, outcome).with_attempts(attempts);
            entry.artifact = artifact;
            entry.notes = notes;

            self.events.publish(&RunEvent::PhaseCompleted {
                run_id: self.run_id.clone(),
                iteration,
                phase,
                degraded: entry.is_degraded(),
                attempts: entry.attempts,
            });
            self.progress.on_phase_complete(iteration, &entry);
            record.phases.push(entry);
        }

        match self.evaluate_stop(state, strategy).await {
            Ok(decision) => {
                self.events.publish(&RunEvent::StopDecision {
                    run_id: self.run_id.clone(),
                    iteration,
                    result: decision.result,
                    reason: decision.rationale.clone(),
                });
                self.progress.on_stop_decision(iteration, &decision);
                record.stop_decision = Some(decision);
                (record, None)
            }
            Err(abort) => (record, Some(abort)),
        }
    }

    /// Cleanup runs once per run, after the loop, whatever ended it.
    ///
    /// Cleanup ignores the run's cancellation token. After a cancel it is
    /// bounded by the call timeout, or [`CLEANUP_GRACE`] when none is set.
    pub(super) async fn cleanup(&self, state: &RunState, summary: String) -> PhaseEntry {
        self.progress.on_phase_start(state.iteration, Phase::Cleanup);
        let vars = TemplateVars::new()
            .with(keys::OBJECTIVE, state.objective.as_str())
            .with(keys::WORKSPACE, state.workspace.as_str())
            .with(keys::REPORT, summary);

        let role = Phase::Cleanup.role();
        let cleanup_token = Some(CancellationToken::new());
        let step = self
            .step
            .run(role, &vars, self.options.chain_for(role), &cleanup_token);

        let result = if is_cancelled(&self.cancellation_token) {
            let limit = self.cleanup_limit.unwrap_or(CLEANUP_GRACE);
            match tokio::time::timeout(limit, step).await {
                Ok(result) => result.map_err(|e| e.to_string()),
                Err(_) => Err(format!("cleanup timed out after {:?}", limit)),
            }
        } else {
            step.await.map_err(|e| e.to_string())
        };

        let outcome = match result {
            Ok(output) => PhaseOutcome::completed(output.rendered()),
            Err(e) => {
                warn!("Cleanup degraded: {}", e);
                PhaseOutcome::degraded(Phase::Cleanup, e)
            }
        };
        let entry = PhaseEntry::new(Phase::Cleanup, outcome);
        self.progress.on_phase_complete(state.iteration, &entry);
        entry
    }

    // ==================== Phase bodies ====================

    async fn planning(
        &self,
        state: &RunState,
        strategy: &IterationStrategy,
        approvals: &mut Vec<ApprovalOutcome>,
    ) -> Result<PhaseResult, StepError> {
        let vars = self.vars_for(Phase::Planning, state, strategy);
        let plan = self.run_role(Phase::Planning, &vars).await?.rendered();

        let Some(gate) = &self.gate else {
            return Ok(PhaseResult::single(plan));
        };
        if !self.options.approval.applies_to(state.iteration) {
            return Ok(PhaseResult::single(plan));
        }

        let reviser = PlanReviser { runner: self, vars };
        match gate
            .review(PLAN_APPROVAL, plan.clone(), &reviser, &self.cancellation_token)
            .await
        {
            Ok(outcome) => {
                let mut result = PhaseResult::single(outcome.artifact.clone());
                result.attempts = outcome.requests;
                if !outcome.approved {
                    result.notes.push(format!(
                        "plan not approved after {} request(s); continuing with latest revision",
                        outcome.requests
                    ));
                }
                approvals.push(outcome);
                Ok(result)
            }
            Err(ApprovalError::Revision(e)) => Err(e),
            Err(e) if e.is_cancelled() => Err(StepError::Invoke(InvokeError::Cancelled)),
            Err(e) => {
                warn!("Plan approval unavailable: {}", e);
                let mut result = PhaseResult::single(plan);
                result.notes.push(format!("approval skipped: {}", e));
                Ok(result)
            }
        }
    }

    async fn execution(
        &self,
        state: &RunState,
        strategy: &IterationStrategy,
    ) -> Result<PhaseResult, StepError> {
        let producer = ExecutionProducer {
            runner: self,
            vars: self.vars_for(Phase::Execution, state, strategy),
        };
        let judge = PlanCriteriaJudge {
            runner: self,
            plan: state.latest(Phase::Planning).unwrap_or_default().to_string(),
        };

        let outcome = RetryWithFeedback::new(self.options.max_step_attempts)
            .run(Phase::Execution, &producer, &judge, self.progress)
            .await?;

        let Some(output) = outcome.output else {
            return Err(StepError::NoOutput {
                attempts: outcome.attempts,
                feedback: outcome.feedback,
            });
        };

        let mut result = PhaseResult {
            text: output.rendered(),
            attempts: outcome.attempts,
            notes: Vec::new(),
        };
        if !outcome.passed {
            result.notes.push(format!(
                "not accepted after {} attempt(s): {}",
                outcome.attempts,
                headline(&outcome.feedback, 200)
            ));
        }
        Ok(result)
    }

    async fn single_step(
        &self,
        phase: Phase,
        state: &RunState,
        strategy: &IterationStrategy,
    ) -> Result<PhaseResult, StepError> {
        let vars = self.vars_for(phase, state, strategy);
        let output = self.run_role(phase, &vars).await?;
        Ok(PhaseResult::single(output.rendered()))
    }

    async fn evaluate_stop(
        &self,
        state: &RunState,
        strategy: &IterationStrategy,
    ) -> Result<StopDecisionRecord, Abort> {
        let mut context = format!("## Objective\n{}", state.objective);
        for (title, phase) in [("Plan", Phase::Planning), ("Critique", Phase::Critique)] {
            if let Some(text) = state.current.get(phase) {
                context.push_str(&format!("\n\n## {}\n{}", title, text));
            }
        }

        match self
            .decision
            .decide(
                &context,
                strategy.stopping_question,
                self.options.chain_for(AgentRole::Decision),
                &self.cancellation_token,
            )
            .await
        {
            Ok(decision) => {
                info!(
                    "Iteration {} stop decision: {} ({})",
                    state.iteration, decision.result, decision.reason
                );
                Ok(StopDecisionRecord::decided(decision.result, decision.reason))
            }
            Err(e) if e.is_cancelled() => Err(Abort::Cancelled),
            Err(e) if e.is_configuration() => Err(Abort::Configuration(e.to_string())),
            Err(e) => {
                warn!("Stop decision failed in iteration {}: {}", state.iteration, e);
                Ok(StopDecisionRecord::failed(e.to_string()))
            }
        }
    }

    // ==================== Helpers ====================

    async fn run_role(&self, phase: Phase, vars: &TemplateVars) -> Result<StepOutput, StepError> {
        let role = phase.role();
        self.step
            .run(role, vars, self.options.chain_for(role), &self.cancellation_token)
            .await
    }

    /// Template variables for `phase`: run context plus the outputs it builds on.
    fn vars_for(&self, phase: Phase, state: &RunState, strategy: &IterationStrategy) -> TemplateVars {
        let mut vars = TemplateVars::new()
            .with(keys::OBJECTIVE, state.objective.as_str())
            .with(keys::ITERATION, format!("{} of {}", state.iteration, state.max_iterations))
            .with(keys::MAX_ITERATIONS, state.max_iterations.to_string())
            .with(keys::STRATEGY, strategy.name)
            .with(keys::FOCUS, strategy.focus)
            .with(keys::PHASE_INTENT, strategy.phase_intent(phase))
            .with(keys::WORKSPACE, state.workspace.as_str());

        let inputs: &[(&str, Phase)] = match phase {
            Phase::Planning => &[],
            Phase::Execution => &[(keys::PLAN, Phase::Planning)],
            Phase::Validation => &[(keys::PLAN, Phase::Planning), (keys::EXECUTION, Phase::Execution)],
            Phase::Writing => &[
                (keys::PLAN, Phase::Planning),
                (keys::EXECUTION, Phase::Execution),
                (keys::VALIDATION, Phase::Validation),
            ],
            Phase::Critique | Phase::Cleanup => &[
                (keys::PLAN, Phase::Planning),
                (keys::EXECUTION, Phase::Execution),
                (keys::VALIDATION, Phase::Validation),
                (keys::WRITING, Phase::Writing),
            ],
        };
        for &(key, source) in inputs {
            vars = vars.with_opt(key, state.current.get(source));
        }

        if phase == Phase::Planning {
            vars = vars
                .with_opt(keys::PREVIOUS_PLAN, state.previous.get(Phase::Planning))
                .with_opt(keys::PREVIOUS_EXECUTION, state.previous.get(Phase::Execution))
                .with_opt(keys::PREVIOUS_VALIDATION, state.previous.get(Phase::Validation))
                .with_opt(keys::PREVIOUS_CRITIQUE, state.previous.get(Phase::Critique));
        }
        if phase == Phase::Critique {
            vars = vars.with(keys::STOPPING_QUESTION, strategy.stopping_question);
        }
        vars
    }
}

// ==================== Retry and approval adapters ====================

struct ExecutionProducer<'r, 'a> {
    runner: &'r PhaseRunner<'a>,
    vars: TemplateVars,
}

#[async_trait]
impl<'r, 'a> AttemptProducer for ExecutionProducer<'r, 'a> {
    type Output = StepOutput;

    async fn produce(&self, _attempt: u32, feedback: Option<&str>) -> Result<StepOutput, StepError> {
        let vars = self.vars.clone().with_opt(keys::FEEDBACK, feedback);
        self.runner.run_role(Phase::Execution, &vars).await
    }

    fn summarize(&self, output: &StepOutput) -> String {
        headline(&output.rendered(), 80)
    }
}

/// Judges execution output against the plan's success criteria.
struct PlanCriteriaJudge<'r, 'a> {
    runner: &'r PhaseRunner<'a>,
    plan: String,
}

#[async_trait]
impl<'r, 'a> AttemptJudge<StepOutput> for PlanCriteriaJudge<'r, 'a> {
    async fn judge(&self, output: &StepOutput) -> Result<Verdict, StepError> {
        let context = format!(
            "## Plan\n{}\n\n## Execution Results\n{}",
            self.plan,
            output.rendered()
        );
        let decision = self
            .runner
            .decision
            .decide(
                &context,
                EXECUTION_QUESTION,
                self.runner.options.chain_for(AgentRole::Decision),
                &self.runner.cancellation_token,
            )
            .await?;
        Ok(if decision.result {
            Verdict::pass(decision.reason)
        } else {
            Verdict::fail(decision.reason)
        })
    }
}

/// Regenerates the plan with reviewer feedback.
struct PlanReviser<'r, 'a> {
    runner: &'r PhaseRunner<'a>,
    vars: TemplateVars,
}

#[async_trait]
impl<'r, 'a> ArtifactReviser for PlanReviser<'r, 'a> {
    async fn revise(&self, artifact: &str, feedback: &str, attempt: u32) -> Result<String, StepError> {
        info!("Revising plan (request {}) with reviewer feedback", attempt);
        let vars = self
            .vars
            .clone()
            .with(keys::PREVIOUS_PLAN, artifact)
            .with(keys::FEEDBACK, feedback);
        Ok(self.runner.run_role(Phase::Planning, &vars).await?.rendered())
    }
}
