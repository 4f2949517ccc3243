//! Loop control from TOML (`[run]` section)

use cadence_application::config::run_options::DEFAULT_MAX_ITERATIONS;
use cadence_application::{GenerationParams, RoleChains, RunOptions};
use cadence_domain::approval::DEFAULT_MAX_REVISIONS;
use cadence_domain::orchestration::retry::DEFAULT_MAX_ATTEMPTS;
use cadence_domain::{ApprovalPoint, ConfigIssue, ConfigIssueCode, HilMode, StrategyBands};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Run loop configuration
///
/// # Example
///
/// ```toml
/// [run]
/// max_iterations = 6
/// max_step_attempts = 3
/// max_approval_revisions = 5
/// approval = "first_plan"      # off | first_plan | every_plan
/// hil_mode = "interactive"     # interactive | auto_approve | auto_revise
/// temperature = 0.7
/// max_output_tokens = 4096
/// timeout_seconds = 120
/// discovery_fraction = 0.3
/// refinement_fraction = 0.3
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRunConfig {
    pub max_iterations: u32,
    pub max_step_attempts: u32,
    pub max_approval_revisions: u32,
    pub approval: String,
    pub hil_mode: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Per-call timeout for a single candidate
    pub timeout_seconds: Option<u64>,
    pub discovery_fraction: f64,
    pub refinement_fraction: f64,
}

impl Default for FileRunConfig {
    fn default() -> Self {
        let bands = StrategyBands::default();
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_step_attempts: DEFAULT_MAX_ATTEMPTS,
            max_approval_revisions: DEFAULT_MAX_REVISIONS,
            approval: "first_plan".to_string(),
            hil_mode: "interactive".to_string(),
            temperature: None,
            max_output_tokens: None,
            timeout_seconds: None,
            discovery_fraction: bands.discovery,
            refinement_fraction: bands.refinement,
        }
    }
}

fn invalid_enum(field: &str, value: &str, valid: &[&str], fallback: &str) -> ConfigIssue {
    ConfigIssue::warning(
        ConfigIssueCode::InvalidEnumValue {
            field: field.to_string(),
            value: value.to_string(),
            valid_values: valid.iter().map(|v| v.to_string()).collect(),
        },
        format!(
            "{}: unknown value '{}', falling back to '{}'",
            field, value, fallback
        ),
    )
}

fn out_of_range(field: &str, value: impl ToString, message: String) -> ConfigIssue {
    ConfigIssue::warning(
        ConfigIssueCode::OutOfRange {
            field: field.to_string(),
            value: value.to_string(),
        },
        message,
    )
}

impl FileRunConfig {
    pub fn parse_hil_mode(&self) -> (HilMode, Vec<ConfigIssue>) {
        match self.hil_mode.parse::<HilMode>() {
            Ok(mode) => (mode, vec![]),
            Err(_) => (
                HilMode::default(),
                vec![invalid_enum(
                    "run.hil_mode",
                    &self.hil_mode,
                    &["interactive", "auto_approve", "auto_revise"],
                    HilMode::default().as_str(),
                )],
            ),
        }
    }

    pub fn parse_approval(&self) -> (ApprovalPoint, Vec<ConfigIssue>) {
        match self.approval.parse::<ApprovalPoint>() {
            Ok(point) => (point, vec![]),
            Err(_) => (
                ApprovalPoint::default(),
                vec![invalid_enum(
                    "run.approval",
                    &self.approval,
                    &["off", "first_plan", "every_plan"],
                    "first_plan",
                )],
            ),
        }
    }

    pub fn parse_bands(&self) -> (StrategyBands, Vec<ConfigIssue>) {
        let bands = StrategyBands::new(self.discovery_fraction, self.refinement_fraction);
        if bands.is_valid() {
            return (bands, vec![]);
        }
        (
            StrategyBands::default(),
            vec![out_of_range(
                "run.discovery_fraction",
                format!("{}+{}", self.discovery_fraction, self.refinement_fraction),
                format!(
                    "run: discovery_fraction ({}) and refinement_fraction ({}) must be positive and sum below 1, using defaults",
                    self.discovery_fraction, self.refinement_fraction
                ),
            )],
        )
    }

    /// Iteration and attempt budgets, each clamped to at least 1.
    pub fn parse_budgets(&self) -> ((u32, u32, u32), Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut at_least_one = |field: &str, value: u32| {
            if value == 0 {
                issues.push(out_of_range(
                    field,
                    value,
                    format!("{}: must be at least 1, using 1", field),
                ));
                1
            } else {
                value
            }
        };
        let budgets = (
            at_least_one("run.max_iterations", self.max_iterations),
            at_least_one("run.max_step_attempts", self.max_step_attempts),
            at_least_one("run.max_approval_revisions", self.max_approval_revisions),
        );
        (budgets, issues)
    }

    pub fn parse_generation(&self) -> (GenerationParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let temperature = match self.temperature {
            Some(t) if !(0.0..=2.0).contains(&t) => {
                issues.push(out_of_range(
                    "run.temperature",
                    t,
                    format!("run.temperature: {} is outside 0.0..=2.0, ignoring", t),
                ));
                None
            }
            other => other,
        };
        let max_output_tokens = match self.max_output_tokens {
            Some(0) => {
                issues.push(out_of_range(
                    "run.max_output_tokens",
                    0,
                    "run.max_output_tokens: must be positive, ignoring".to_string(),
                ));
                None
            }
            other => other,
        };
        (
            GenerationParams {
                temperature,
                max_output_tokens,
            },
            issues,
        )
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .filter(|s| *s > 0)
            .map(Duration::from_secs)
    }

    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        issues.extend(self.parse_hil_mode().1);
        issues.extend(self.parse_approval().1);
        issues.extend(self.parse_bands().1);
        issues.extend(self.parse_budgets().1);
        issues.extend(self.parse_generation().1);
        issues
    }

    /// Run options over the given chains, bad values replaced by defaults.
    pub fn to_run_options(&self, chains: RoleChains) -> RunOptions {
        let (max_iterations, max_step_attempts, max_approval_revisions) = self.parse_budgets().0;
        RunOptions::new(chains)
            .with_max_iterations(max_iterations)
            .with_max_step_attempts(max_step_attempts)
            .with_max_approval_revisions(max_approval_revisions)
            .with_approval(self.parse_approval().0)
            .with_bands(self.parse_bands().0)
            .with_generation(self.parse_generation().0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_domain::{FallbackChain, ProviderId};

    #[test]
    fn test_defaults_are_valid() {
        assert!(FileRunConfig::default().validate().is_empty());
    }

    #[test]
    fn test_invalid_hil_mode_falls_back() {
        let config = FileRunConfig {
            hil_mode: "sometimes".into(),
            ..Default::default()
        };
        let (mode, issues) = config.parse_hil_mode();
        assert_eq!(mode, HilMode::Interactive);
        assert_eq!(issues.len(), 1);
        assert!(matches!(
            issues[0].code,
            ConfigIssueCode::InvalidEnumValue { .. }
        ));
    }

    #[test]
    fn test_bad_bands_fall_back() {
        let config = FileRunConfig {
            discovery_fraction: 0.7,
            refinement_fraction: 0.5,
            ..Default::default()
        };
        let (bands, issues) = config.parse_bands();
        assert_eq!(bands, StrategyBands::default());
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_zero_budgets_clamped() {
        let config = FileRunConfig {
            max_iterations: 0,
            max_step_attempts: 0,
            ..Default::default()
        };
        let ((iterations, attempts, revisions), issues) = config.parse_budgets();
        assert_eq!((iterations, attempts, revisions), (1, 1, 5));
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_to_run_options() {
        let config: FileRunConfig = toml::from_str(
            r#"
max_iterations = 4
approval = "every_plan"
temperature = 0.2
timeout_seconds = 30
"#,
        )
        .unwrap();
        let chain = FallbackChain::builder(ProviderId::OpenAi, "gpt-4.1").build().unwrap();
        let options = config.to_run_options(RoleChains::new(chain));

        assert_eq!(options.max_iterations, 4);
        assert_eq!(options.max_step_attempts, 3);
        assert_eq!(options.approval, ApprovalPoint::EveryPlan);
        assert_eq!(options.generation.temperature, Some(0.2));
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_out_of_range_temperature_ignored() {
        let config = FileRunConfig {
            temperature: Some(3.5),
            ..Default::default()
        };
        let (generation, issues) = config.parse_generation();
        assert_eq!(generation.temperature, None);
        assert_eq!(issues.len(), 1);
    }
}
