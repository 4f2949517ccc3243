//! Prompt template variables.
//!
//! The orchestrator fills [`TemplateVars`] for each agent step; a prompt
//! builder turns them into text. The core never inspects the rendered text.

use std::collections::BTreeMap;

/// Well-known variable names.
pub mod keys {
    pub const OBJECTIVE: &str = "objective";
    pub const ITERATION: &str = "iteration";
    pub const MAX_ITERATIONS: &str = "max_iterations";
    pub const STRATEGY: &str = "strategy";
    pub const FOCUS: &str = "focus";
    pub const PHASE_INTENT: &str = "phase_intent";
    pub const STOPPING_QUESTION: &str = "stopping_question";
    pub const WORKSPACE: &str = "workspace";
    pub const PLAN: &str = "plan";
    pub const EXECUTION: &str = "execution";
    pub const VALIDATION: &str = "validation";
    pub const WRITING: &str = "writing";
    pub const CRITIQUE: &str = "critique";
    pub const PREVIOUS_PLAN: &str = "previous_plan";
    pub const PREVIOUS_EXECUTION: &str = "previous_execution";
    pub const PREVIOUS_VALIDATION: &str = "previous_validation";
    pub const PREVIOUS_CRITIQUE: &str = "previous_critique";
    pub const FEEDBACK: &str = "feedback";
    pub const REPORT: &str = "report";
}

/// Ordered name → value map for one prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key` only when `value` is present.
    pub fn with_opt(mut self, key: impl Into<String>, value: Option<&str>) -> Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
