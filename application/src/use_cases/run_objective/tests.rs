use super::*;
use crate::config::{RoleChains, RunOptions};
use crate::ports::human_channel::AutoReviseChannel;
use crate::ports::llm_gateway::GatewayError;
use crate::ports::workspace::InMemoryWorkspace;
use crate::use_cases::testing::{RecordingSink, ScriptedGateway};
use cadence_domain::{AgentRole, ApprovalPoint, FallbackChain, Phase, ProviderId, ProviderResponse};
use std::sync::atomic::{AtomicUsize, Ordering};

const EXECUTION_JUDGE: &str = "success criteria the plan sets";

fn chain(model: &str) -> FallbackChain {
    FallbackChain::builder(ProviderId::OpenAi, model).build().unwrap()
}

fn options(max_iterations: u32) -> RunOptions {
    RunOptions::new(RoleChains::new(chain("default-model")))
        .with_max_iterations(max_iterations)
        .with_approval(ApprovalPoint::Off)
}

fn decision(result: bool, reason: &str) -> Result<ProviderResponse, GatewayError> {
    Ok(ProviderResponse::from_text(format!(
        "{{\"result\": {}, \"reason\": \"{}\"}}",
        result, reason
    )))
}

/// Gateway where every role answers, executions pass, and the stop decision
/// answers `stop_on(n)` for the n-th stop question (1-based).
fn pipeline_gateway<F>(stop_on: F) -> ScriptedGateway
where
    F: Fn(usize) -> Result<ProviderResponse, GatewayError> + Send + Sync + 'static,
{
    let stop_calls = AtomicUsize::new(0);
    ScriptedGateway::new(move |_, request| {
        let system = request.messages[0].content.clone();
        let user = request.last_user_content().unwrap_or_default().to_string();
        if system.contains("decision assistant") {
            if user.contains(EXECUTION_JUDGE) {
                return decision(true, "criteria met");
            }
            let n = stop_calls.fetch_add(1, Ordering::SeqCst) + 1;
            return stop_on(n);
        }
        let role = system.split_whitespace().nth(3).unwrap_or("agent");
        Ok(ProviderResponse::from_text(format!("{} output", role)))
    })
}

fn use_case(gateway: &Arc<ScriptedGateway>, workspace: &Arc<InMemoryWorkspace>) -> RunObjectiveUseCase {
    RunObjectiveUseCase::new(gateway.clone(), workspace.clone())
}

#[tokio::test]
async fn test_stops_when_objective_met() {
    let gateway = Arc::new(pipeline_gateway(|n| decision(n == 2, "second pass done")));
    let workspace = Arc::new(InMemoryWorkspace::new());
    let sink = Arc::new(RecordingSink::default());

    let report = use_case(&gateway, &workspace)
        .with_event_sink(sink.clone())
        .execute(RunObjectiveInput::new("Write a changelog", "runs/demo", options(3)))
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::ObjectiveMet { iteration: 2 });
    assert_eq!(report.iteration_count(), 2);
    assert_eq!(report.degraded_count(), 0);
    assert_eq!(gateway.count_system("cleanup agent"), 1);
    assert_eq!(gateway.count_system("planning agent"), 2);

    let iteration = &report.iterations[0];
    assert_eq!(iteration.phases.len(), 5);
    assert_eq!(iteration.stop_decision.as_ref().and_then(|d| d.result), Some(false));
    assert!(report.cleanup.as_ref().is_some_and(|c| !c.is_degraded()));

    let paths = workspace.paths();
    assert!(paths.contains(&"runs/demo/iteration-1/planning.md".to_string()));
    assert!(paths.contains(&"runs/demo/iteration-2/critique.md".to_string()));
    assert!(paths.contains(&"runs/demo/report.md".to_string()));
    assert!(!paths.iter().any(|p| p.starts_with("runs/demo/iteration-3")));

    let names = sink.names();
    assert_eq!(names.first().map(String::as_str), Some("run_started"));
    assert_eq!(names.last().map(String::as_str), Some("run_completed"));
    assert!(report.usage.is_empty());
}

#[tokio::test]
async fn test_exhausts_iteration_budget() {
    let gateway = Arc::new(pipeline_gateway(|_| decision(false, "keep going")));
    let workspace = Arc::new(InMemoryWorkspace::new());

    let report = use_case(&gateway, &workspace)
        .execute(RunObjectiveInput::new("Objective", "ws", options(2)))
        .await
        .unwrap();

    assert_eq!(report.stop_reason, StopReason::IterationsExhausted { iterations: 2 });
    assert_eq!(report.iteration_count(), 2);
    assert_eq!(gateway.count_system("cleanup agent"), 1);
}

#[tokio::test]
async fn test_failed_stop_decision_continues() {
    let gateway = Arc::new(pipeline_gateway(|_| {
        Ok(ProviderResponse::from_text("no idea"))
    }));
    let workspace = Arc::new(InMemoryWorkspace::new());

    let report = use_case(&gateway, &workspace)
        .execute(RunObjectiveInput::new("Objective", "ws", options(2)))
        .await
        .unwrap();

    assert_eq!(report.iteration_count(), 2);
    let decision = report.iterations[0].stop_decision.as_ref().unwrap();
    assert_eq!(decision.result, None);
    assert!(decision.rationale.starts_with("decision failed, continuing"));
    assert_eq!(gateway.count_system("cleanup agent"), 1);
}

#[tokio::test]
async fn test_failed_phase_is_degraded_and_run_continues() {
    let gateway = Arc::new(ScriptedGateway::new(|_, request| {
        let system = request.messages[0].content.clone();
        if system.contains("execution agent") {
            return Err(GatewayError::Other("upstream exploded".into()));
        }
        if system.contains("decision assistant") {
            return decision(false, "not yet");
        }
        Ok(ProviderResponse::from_text("fine"))
    }));
    let workspace = Arc::new(InMemoryWorkspace::new());

    let report = use_case(&gateway, &workspace)
        .execute(RunObjectiveInput::new("Objective", "ws", options(1)))
        .await
        .unwrap();

    let execution = report.iterations[0].phase(Phase::Execution).unwrap();
    assert!(execution.is_degraded());
    assert_eq!(execution.attempts, 3);
    assert!(execution.outcome.text().starts_with("Execution phase failed:"));
    assert!(!report.iterations[0].phase(Phase::Writing).unwrap().is_degraded());
    assert_eq!(gateway.count_system("execution agent"), 3);

    let stored = workspace.read("ws/iteration-1/execution.md").await.unwrap();
    assert!(String::from_utf8(stored).unwrap().starts_with("Execution phase failed:"));
}

#[tokio::test]
async fn test_configuration_error_aborts_after_cleanup() {
    let gateway = Arc::new(
        pipeline_gateway(|_| decision(false, "never asked"))
            .failing_init("planner-model", GatewayError::MissingCredential("OPENAI_API_KEY".into())),
    );
    let workspace = Arc::new(InMemoryWorkspace::new());
    let mut opts = options(3);
    opts.chains = RoleChains::new(chain("default-model")).with_role(AgentRole::Planner, chain("planner-model"));

    let err = use_case(&gateway, &workspace)
        .execute(RunObjectiveInput::new("Objective", "ws", opts))
        .await
        .unwrap_err();

    let report = err.report().expect("partial report");
    assert!(matches!(report.stop_reason, StopReason::ConfigurationError { .. }));
    assert!(matches!(err, RunObjectiveError::Configuration { .. }));
    assert_eq!(gateway.count_system("execution agent"), 0);
    assert_eq!(gateway.count_system("cleanup agent"), 1);
    assert!(workspace.paths().contains(&"ws/report.md".to_string()));
}

#[tokio::test]
async fn test_invalid_workspace_fails_before_any_call() {
    let gateway = Arc::new(pipeline_gateway(|_| decision(true, "done")));
    let workspace = Arc::new(InMemoryWorkspace::new());

    let err = use_case(&gateway, &workspace)
        .execute(RunObjectiveInput::new("Objective", "   ", options(3)))
        .await
        .unwrap_err();

    assert!(matches!(err, RunObjectiveError::InvalidInput(_)));
    assert!(gateway.calls().is_empty());
    assert!(workspace.paths().is_empty());
}

#[tokio::test]
async fn test_cancelled_run_returns_partial_report() {
    let gateway = Arc::new(pipeline_gateway(|_| decision(true, "done")));
    let workspace = Arc::new(InMemoryWorkspace::new());
    let token = CancellationToken::new();
    token.cancel();

    let err = use_case(&gateway, &workspace)
        .with_cancellation(token)
        .execute(RunObjectiveInput::new("Objective", "ws", options(3)))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    let report = err.report().unwrap();
    assert_eq!(report.iteration_count(), 0);
    assert!(report.cleanup.as_ref().is_some_and(|c| !c.is_degraded()));
    assert_eq!(gateway.calls().len(), 1);
    assert_eq!(gateway.count_system("cleanup agent"), 1);
}

#[tokio::test]
async fn test_cleanup_still_runs_after_mid_run_cancel() {
    let token = CancellationToken::new();
    let trigger = token.clone();
    let gateway = Arc::new(ScriptedGateway::new(move |_, request| {
        let system = request.messages[0].content.clone();
        if system.contains("execution agent") {
            trigger.cancel();
        }
        if system.contains("decision assistant") {
            return decision(true, "criteria met");
        }
        Ok(ProviderResponse::from_text("agent output"))
    }));
    let workspace = Arc::new(InMemoryWorkspace::new());

    let err = use_case(&gateway, &workspace)
        .with_cancellation(token)
        .execute(RunObjectiveInput::new("Objective", "ws", options(3)))
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    let report = err.report().unwrap();
    assert!(matches!(report.stop_reason, StopReason::Cancelled { iteration: 1 }));
    assert_eq!(gateway.count_system("writing agent"), 0);
    assert_eq!(gateway.count_system("cleanup agent"), 1);
    let cleanup = report.cleanup.as_ref().unwrap();
    assert!(!cleanup.is_degraded());
    assert!(workspace.paths().contains(&"ws/report.md".to_string()));
}

#[tokio::test]
async fn test_planning_sees_previous_iteration_outputs() {
    let gateway = Arc::new(pipeline_gateway(|n| decision(n == 2, "second pass done")));
    let workspace = Arc::new(InMemoryWorkspace::new());

    use_case(&gateway, &workspace)
        .execute(RunObjectiveInput::new("Objective", "ws", options(3)))
        .await
        .unwrap();

    let plans: Vec<_> = gateway
        .calls()
        .into_iter()
        .filter(|c| c.system.contains("planning agent"))
        .collect();
    assert_eq!(plans.len(), 2);
    assert!(!plans[0].user.contains("## Previous Execution"));
    assert!(plans[1].user.contains("## Previous Execution"));
    assert!(plans[1].user.contains("## Previous Validation"));
    assert!(plans[1].user.contains("## Previous Critique"));
}

#[tokio::test]
async fn test_plan_gate_bounded_by_max_revisions() {
    let gateway = Arc::new(pipeline_gateway(|_| decision(true, "done")));
    let workspace = Arc::new(InMemoryWorkspace::new());
    let opts = options(1)
        .with_approval(ApprovalPoint::FirstPlan)
        .with_max_approval_revisions(2);

    let report = use_case(&gateway, &workspace)
        .with_human_channel(Arc::new(AutoReviseChannel::default()))
        .execute(RunObjectiveInput::new("Objective", "ws", opts))
        .await
        .unwrap();

    assert_eq!(report.approvals.len(), 1);
    assert!(!report.approvals[0].approved);
    assert_eq!(report.approvals[0].requests, 2);
    assert_eq!(gateway.count_system("planning agent"), 2);
    let planning = report.iterations[0].phase(Phase::Planning).unwrap();
    assert!(!planning.notes.is_empty());
}
