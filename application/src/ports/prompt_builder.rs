//! Prompt builder port.
//!
//! Turns template variables into the instruction text for one agent step.
//! The pipeline treats the result as opaque.

use cadence_domain::prompt::keys;
use cadence_domain::{AgentRole, TemplateVars};

/// Rendered prompt for one model call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: Option<String>,
    pub user: String,
}

pub trait PromptBuilder: Send + Sync {
    fn build(&self, role: AgentRole, vars: &TemplateVars) -> Prompt;
}

/// Renders a short role instruction and one markdown section per variable.
///
/// Well-known variables come first in a fixed order; any others follow
/// alphabetically.
pub struct SectionPromptBuilder;

const SECTION_ORDER: &[(&str, &str)] = &[
    (keys::OBJECTIVE, "Objective"),
    (keys::ITERATION, "Iteration"),
    (keys::STRATEGY, "Strategy"),
    (keys::FOCUS, "Focus"),
    (keys::PHASE_INTENT, "Current Step"),
    (keys::STOPPING_QUESTION, "Stopping Question"),
    (keys::WORKSPACE, "Workspace"),
    (keys::PREVIOUS_PLAN, "Previous Plan"),
    (keys::PREVIOUS_EXECUTION, "Previous Execution"),
    (keys::PREVIOUS_VALIDATION, "Previous Validation"),
    (keys::PREVIOUS_CRITIQUE, "Previous Critique"),
    (keys::PLAN, "Plan"),
    (keys::EXECUTION, "Execution Results"),
    (keys::VALIDATION, "Validation Results"),
    (keys::WRITING, "Written Deliverables"),
    (keys::CRITIQUE, "Critique"),
    (keys::REPORT, "Run Summary"),
    (keys::FEEDBACK, "Feedback"),
];

impl SectionPromptBuilder {
    fn instruction(role: AgentRole) -> &'static str {
        match role {
            AgentRole::Planner => {
                "You are the planning agent. Produce a step-by-step plan with explicit success criteria for each step."
            }
            AgentRole::Executor => {
                "You are the execution agent. Carry out the plan and report what was done and the evidence for each step."
            }
            AgentRole::Validator => {
                "You are the validation agent. Check the execution results against the plan's success criteria and report what passed and what failed."
            }
            AgentRole::Writer => {
                "You are the writing agent. Turn the validated results into the deliverable documents for the objective."
            }
            AgentRole::Critic => {
                "You are the critique agent. Identify gaps, risks and improvements for the next iteration."
            }
            AgentRole::Cleanup => {
                "You are the cleanup agent. Summarize the final state and list anything left unfinished."
            }
            AgentRole::Decision => {
                "You are a decision assistant. Answer strictly in the requested format."
            }
        }
    }
}

impl PromptBuilder for SectionPromptBuilder {
    fn build(&self, role: AgentRole, vars: &TemplateVars) -> Prompt {
        let mut user = String::new();
        let mut push = |title: &str, value: &str| {
            if value.trim().is_empty() {
                return;
            }
            if !user.is_empty() {
                user.push_str("\n\n");
            }
            user.push_str("## ");
            user.push_str(title);
            user.push('\n');
            user.push_str(value.trim_end());
        };

        for &(key, title) in SECTION_ORDER {
            if let Some(value) = vars.get(key) {
                push(title, value);
            }
        }
        for (key, value) in vars.iter() {
            if !SECTION_ORDER.iter().any(|&(k, _)| k == key) {
                push(key, value);
            }
        }

        Prompt {
            system: Some(Self::instruction(role).to_string()),
            user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sections_in_fixed_order() {
        let vars = TemplateVars::new()
            .with(keys::CRITIQUE, "tighten step 2")
            .with(keys::OBJECTIVE, "Summarize the repo")
            .with("custom_note", "be brief")
            .with(keys::PLAN, "");

        let prompt = SectionPromptBuilder.build(AgentRole::Planner, &vars);
        let objective = prompt.user.find("## Objective").unwrap();
        let critique = prompt.user.find("## Critique").unwrap();
        let custom = prompt.user.find("## custom_note").unwrap();
        assert!(objective < critique && critique < custom);
        assert!(!prompt.user.contains("## Plan"));
        assert!(prompt.system.unwrap().contains("planning agent"));
    }
}
