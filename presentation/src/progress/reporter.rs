//! Progress reporting for pipeline runs

use cadence_application::ports::progress::RunProgressNotifier;
use cadence_domain::{FinalReport, IterationStrategy, Phase, PhaseEntry, StopDecisionRecord};
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Reports progress with a spinner per running phase
pub struct ProgressReporter {
    multi: MultiProgress,
    phase_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            phase_bar: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg} {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn phase_label(iteration: u32, phase: Phase) -> String {
        format!("[{}] {}", iteration, phase.title())
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.phase_bar.lock()
            && let Some(pb) = guard.as_ref()
        {
            f(pb);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn entry_status(entry: &PhaseEntry) -> String {
    let attempts = if entry.attempts > 1 {
        format!(" ({} attempts)", entry.attempts)
    } else {
        String::new()
    };
    if entry.is_degraded() {
        format!("{} degraded{}", "x".red(), attempts)
    } else {
        format!("{} done{}", "v".green(), attempts)
    }
}

fn decision_status(decision: &StopDecisionRecord) -> String {
    match decision.result {
        Some(true) => format!("{} objective met: {}", "■".green(), decision.rationale),
        Some(false) => format!("{} continue: {}", "→".cyan(), decision.rationale),
        None => format!("{} undecided, continuing: {}", "?".yellow(), decision.rationale),
    }
}

impl RunProgressNotifier for ProgressReporter {
    fn on_iteration_start(&self, iteration: u32, max: u32, strategy: &IterationStrategy) {
        let _ = self.multi.println(format!(
            "{} {} {}",
            format!("Iteration {}/{}", iteration, max).bold(),
            strategy.name.cyan(),
            format!("· {}", strategy.focus).dimmed()
        ));
    }

    fn on_phase_start(&self, iteration: u32, phase: Phase) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(Self::spinner_style());
        pb.set_prefix(Self::phase_label(iteration, phase));
        pb.set_message("running...");
        pb.enable_steady_tick(Duration::from_millis(120));

        if let Ok(mut guard) = self.phase_bar.lock()
            && let Some(previous) = guard.replace(pb)
        {
            previous.finish_and_clear();
        }
    }

    fn on_step_retry(&self, _phase: Phase, attempt: u32, max_attempts: u32, _feedback: &str) {
        self.with_bar(|pb| {
            pb.set_message(format!("retrying (attempt {}/{})...", attempt, max_attempts));
        });
    }

    fn on_phase_complete(&self, _iteration: u32, entry: &PhaseEntry) {
        if let Ok(mut guard) = self.phase_bar.lock()
            && let Some(pb) = guard.take()
        {
            pb.finish_with_message(entry_status(entry));
        }
    }

    fn on_stop_decision(&self, _iteration: u32, decision: &StopDecisionRecord) {
        let _ = self.multi.println(format!("  {}", decision_status(decision)));
    }

    fn on_run_complete(&self, report: &FinalReport) {
        let _ = self.multi.println(format!(
            "{} {}",
            "Run complete:".bold(),
            report.stop_reason
        ));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl RunProgressNotifier for SimpleProgress {
    fn on_iteration_start(&self, iteration: u32, max: u32, strategy: &IterationStrategy) {
        println!(
            "{} {} ({})",
            "->".cyan(),
            format!("Iteration {}/{}", iteration, max).bold(),
            strategy.name
        );
    }

    fn on_phase_complete(&self, iteration: u32, entry: &PhaseEntry) {
        println!(
            "  {} {}",
            ProgressReporter::phase_label(iteration, entry.phase),
            entry_status(entry)
        );
    }

    fn on_step_retry(&self, phase: Phase, attempt: u32, max_attempts: u32, _feedback: &str) {
        println!(
            "  {} {} retry {}/{}",
            "↻".yellow(),
            phase.title(),
            attempt,
            max_attempts
        );
    }

    fn on_stop_decision(&self, _iteration: u32, decision: &StopDecisionRecord) {
        println!("  {}", decision_status(decision));
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_domain::PhaseOutcome;

    #[test]
    fn test_entry_status_marks_degraded() {
        colored::control::set_override(false);
        let ok = PhaseEntry::new(Phase::Writing, PhaseOutcome::completed("draft"));
        assert_eq!(entry_status(&ok), "v done");

        let degraded =
            PhaseEntry::new(Phase::Execution, PhaseOutcome::degraded(Phase::Execution, "timeout"))
                .with_attempts(3);
        assert_eq!(entry_status(&degraded), "x degraded (3 attempts)");
    }

    #[test]
    fn test_decision_status() {
        colored::control::set_override(false);
        let stop = StopDecisionRecord::decided(true, "criteria met");
        assert_eq!(decision_status(&stop), "■ objective met: criteria met");
    }
}
