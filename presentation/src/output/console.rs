//! Console output formatter for run reports

use crate::cli::commands::OutputFormat;
use cadence_domain::core::string::truncate;
use cadence_domain::{FinalReport, Phase, PhaseEntry};
use colored::Colorize;

/// Formats final reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn render(report: &FinalReport, format: OutputFormat) -> String {
        match format {
            OutputFormat::Summary => Self::format_summary(report),
            OutputFormat::Markdown => report.to_markdown(),
            OutputFormat::Json => Self::format_json(report),
        }
    }

    /// Outcome, per-iteration phase table and the latest written output
    pub fn format_summary(report: &FinalReport) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Run Report"));
        output.push('\n');

        output.push_str(&format!(
            "{} {}\n",
            "Objective:".cyan().bold(),
            report.objective
        ));
        output.push_str(&format!(
            "{} {}\n",
            "Outcome:".cyan().bold(),
            if report.objective_met() {
                report.stop_reason.to_string().green()
            } else {
                report.stop_reason.to_string().yellow()
            }
        ));
        output.push_str(&format!(
            "{} {} iteration(s), {} degraded phase(s), {:.1}s, {} tokens\n",
            "Stats:".cyan().bold(),
            report.iteration_count(),
            report.degraded_count(),
            report.duration_ms as f64 / 1000.0,
            report.usage.total_tokens
        ));

        for approval in &report.approvals {
            let status = if approval.approved {
                "approved".green()
            } else {
                format!("not approved after {} request(s)", approval.requests).yellow()
            };
            output.push_str(&format!(
                "{} {} {}\n",
                "Approval:".cyan().bold(),
                approval.kind,
                status
            ));
        }

        for iteration in &report.iterations {
            output.push_str(&Self::section_header(&format!(
                "Iteration {}: {}",
                iteration.iteration, iteration.strategy_name
            )));
            for entry in &iteration.phases {
                output.push_str(&Self::phase_line(entry));
            }
            if let Some(decision) = &iteration.stop_decision {
                output.push_str(&format!(
                    "  {} {}\n",
                    "stop?".dimmed(),
                    truncate(&decision.rationale, 100)
                ));
            }
        }

        if let Some(cleanup) = &report.cleanup {
            output.push_str(&Self::section_header("Cleanup"));
            output.push_str(&Self::phase_line(cleanup));
        }

        if let Some(text) = report.latest_output(Phase::Writing) {
            output.push_str(&Self::section_header("Latest Output"));
            output.push_str(&format!("\n{}\n", text.trim_end()));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(report: &FinalReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn phase_line(entry: &PhaseEntry) -> String {
        let mark = if entry.is_degraded() {
            "x".red()
        } else {
            "v".green()
        };
        let mut line = format!("  {} {:<11}", mark, entry.phase.title());
        if entry.attempts > 1 {
            line.push_str(&format!(" {} attempts", entry.attempts));
        }
        if let Some(path) = &entry.artifact {
            line.push_str(&format!(" {}", path.dimmed()));
        }
        line.push('\n');
        for note in &entry.notes {
            line.push_str(&format!("      {} {}\n", "note:".yellow(), note));
        }
        line
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_domain::{
        IterationRecord, PhaseOutcome, StopDecisionRecord, StopReason, StrategyKind, TokenUsage,
    };

    fn report() -> FinalReport {
        let mut execution = PhaseEntry::new(
            Phase::Execution,
            PhaseOutcome::degraded(Phase::Execution, "all candidates failed"),
        )
        .with_attempts(3);
        execution.notes.push("kept best-effort output".into());

        FinalReport {
            run_id: "run-1".into(),
            objective: "Write the guide".into(),
            workspace: "guide".into(),
            started_at: "2026-01-01T00:00:00Z".into(),
            duration_ms: 1500,
            iterations: vec![IterationRecord {
                iteration: 1,
                strategy: StrategyKind::Completion,
                strategy_name: "Completion".into(),
                phases: vec![
                    PhaseEntry::new(Phase::Planning, PhaseOutcome::completed("plan")),
                    execution,
                    PhaseEntry::new(Phase::Writing, PhaseOutcome::completed("The guide.")),
                ],
                stop_decision: Some(StopDecisionRecord::decided(true, "done")),
            }],
            stop_reason: StopReason::ObjectiveMet { iteration: 1 },
            approvals: vec![],
            cleanup: None,
            usage: TokenUsage::new(100, 50, None),
        }
    }

    #[test]
    fn test_summary_lists_phases_and_output() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format_summary(&report());

        assert!(text.contains("objective met at iteration 1"));
        assert!(text.contains("1 degraded phase(s)"));
        assert!(text.contains("150 tokens"));
        assert!(text.contains("x Execution   3 attempts"));
        assert!(text.contains("note: kept best-effort output"));
        assert!(text.contains("The guide."));
    }

    #[test]
    fn test_json_round_trips() {
        let json = ConsoleFormatter::render(&report(), OutputFormat::Json);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["stop_reason"]["reason"], "objective_met");
        assert_eq!(value["iterations"][0]["phases"].as_array().unwrap().len(), 3);
    }
}
