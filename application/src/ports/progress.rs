//! Run progress port.
//!
//! [`RunProgressNotifier`] is an **output port** that the presentation layer
//! implements to show pipeline progress. All methods have default no-op
//! implementations, so implementers only override what they display.

use cadence_domain::{FinalReport, IterationStrategy, Phase, PhaseEntry, StopDecisionRecord};

pub trait RunProgressNotifier: Send + Sync {
    /// Iteration `iteration` of `max` begins with `strategy`
    fn on_iteration_start(&self, _iteration: u32, _max: u32, _strategy: &IterationStrategy) {}

    fn on_phase_start(&self, _iteration: u32, _phase: Phase) {}

    fn on_phase_complete(&self, _iteration: u32, _entry: &PhaseEntry) {}

    /// Called before each execution retry
    fn on_step_retry(&self, _phase: Phase, _attempt: u32, _max_attempts: u32, _feedback: &str) {}

    fn on_stop_decision(&self, _iteration: u32, _decision: &StopDecisionRecord) {}

    fn on_run_complete(&self, _report: &FinalReport) {}
}

/// No-op progress notifier
pub struct NoRunProgress;

impl RunProgressNotifier for NoRunProgress {}

/// A progress notifier that delegates to multiple inner notifiers.
pub struct CompositeRunProgress<'a> {
    delegates: Vec<&'a dyn RunProgressNotifier>,
}

impl<'a> CompositeRunProgress<'a> {
    pub fn new(delegates: Vec<&'a dyn RunProgressNotifier>) -> Self {
        Self { delegates }
    }
}

/// Macro to delegate a method call to all inner notifiers.
macro_rules! delegate {
    ($self:ident, $method:ident $(, $arg:expr)*) => {
        for d in &$self.delegates {
            d.$method($($arg),*);
        }
    };
}

impl RunProgressNotifier for CompositeRunProgress<'_> {
    fn on_iteration_start(&self, iteration: u32, max: u32, strategy: &IterationStrategy) {
        delegate!(self, on_iteration_start, iteration, max, strategy);
    }

    fn on_phase_start(&self, iteration: u32, phase: Phase) {
        delegate!(self, on_phase_start, iteration, phase);
    }

    fn on_phase_complete(&self, iteration: u32, entry: &PhaseEntry) {
        delegate!(self, on_phase_complete, iteration, entry);
    }

    fn on_step_retry(&self, phase: Phase, attempt: u32, max_attempts: u32, feedback: &str) {
        delegate!(self, on_step_retry, phase, attempt, max_attempts, feedback);
    }

    fn on_stop_decision(&self, iteration: u32, decision: &StopDecisionRecord) {
        delegate!(self, on_stop_decision, iteration, decision);
    }

    fn on_run_complete(&self, report: &FinalReport) {
        delegate!(self, on_run_complete, report);
    }
}
