use cadence_application::ports::event_sink::{EventSink, EventSinkError};
use cadence_domain::RunEvent;
use tracing::{debug, info, warn};

/// Mirrors run events into `tracing` at levels matching their weight.
///
/// Per-call model events go to `debug`; phase and run milestones to `info`;
/// failures to `warn`.
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn name(&self) -> &str {
        "tracing"
    }

    fn emit(&self, event: &RunEvent) -> Result<(), EventSinkError> {
        match event {
            RunEvent::RunStarted {
                run_id,
                max_iterations,
                ..
            } => info!("Run {} started (max {} iterations)", run_id, max_iterations),
            RunEvent::IterationStarted {
                iteration,
                strategy_name,
                ..
            } => info!("Iteration {} started: {}", iteration, strategy_name),
            RunEvent::PhaseCompleted {
                iteration,
                phase,
                degraded: true,
                attempts,
                ..
            } => warn!(
                "Iteration {} {} phase degraded after {} attempt(s)",
                iteration,
                phase.as_str(),
                attempts
            ),
            RunEvent::PhaseCompleted {
                iteration, phase, ..
            } => debug!("Iteration {} {} phase completed", iteration, phase.as_str()),
            RunEvent::StopDecision {
                iteration,
                result,
                reason,
                ..
            } => info!(
                "Iteration {} stop decision: {} ({})",
                iteration,
                match result {
                    Some(true) => "stop",
                    Some(false) => "continue",
                    None => "undecided",
                },
                reason
            ),
            RunEvent::LlmInitializationError {
                candidate,
                error,
                failure,
            }
            | RunEvent::LlmGenerationError {
                candidate,
                error,
                failure,
                ..
            } => warn!(
                "{} candidate {}:{} failed ({}): {}",
                candidate.role, candidate.provider, candidate.model, failure, error
            ),
            RunEvent::FallbackExhausted {
                role,
                attempts,
                last_error,
                ..
            } => warn!(
                "{} exhausted {} candidate(s); last error: {}",
                role, attempts, last_error
            ),
            RunEvent::RunCompleted {
                run_id,
                iterations,
                duration_ms,
                ..
            } => info!(
                "Run {} completed after {} iteration(s) in {}ms",
                run_id, iterations, duration_ms
            ),
            other => debug!("event: {}", other.name()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_fails() {
        let sink = TracingEventSink;
        assert!(
            sink.emit(&RunEvent::ApprovalResolved {
                request_id: "plan_approval_1_1".into(),
                approved: true,
            })
            .is_ok()
        );
    }
}
