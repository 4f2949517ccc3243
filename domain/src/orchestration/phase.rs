//! Pipeline phases and the agent roles that serve them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One step of the per-iteration pipeline, plus terminal cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Planning,
    Execution,
    Validation,
    Writing,
    Critique,
    Cleanup,
}

impl Phase {
    /// Phases run inside every iteration, in order.
    pub const ITERATION: [Phase; 5] = [
        Phase::Planning,
        Phase::Execution,
        Phase::Validation,
        Phase::Writing,
        Phase::Critique,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Execution => "execution",
            Phase::Validation => "validation",
            Phase::Writing => "writing",
            Phase::Critique => "critique",
            Phase::Cleanup => "cleanup",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Phase::Planning => "Planning",
            Phase::Execution => "Execution",
            Phase::Validation => "Validation",
            Phase::Writing => "Writing",
            Phase::Critique => "Critique",
            Phase::Cleanup => "Cleanup",
        }
    }

    pub fn role(&self) -> AgentRole {
        match self {
            Phase::Planning => AgentRole::Planner,
            Phase::Execution => AgentRole::Executor,
            Phase::Validation => AgentRole::Validator,
            Phase::Writing => AgentRole::Writer,
            Phase::Critique => AgentRole::Critic,
            Phase::Cleanup => AgentRole::Cleanup,
        }
    }

    /// Text that stands in for a failed phase's output downstream.
    pub fn placeholder(&self, reason: &str) -> String {
        format!("{} phase failed: {}", self.title(), reason)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who issues a model call. Each role can carry its own fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Planner,
    Executor,
    Validator,
    Writer,
    Critic,
    Cleanup,
    /// Yes/no judge for step verdicts and the stopping oracle.
    Decision,
}

impl AgentRole {
    pub const ALL: [AgentRole; 7] = [
        AgentRole::Planner,
        AgentRole::Executor,
        AgentRole::Validator,
        AgentRole::Writer,
        AgentRole::Critic,
        AgentRole::Cleanup,
        AgentRole::Decision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentRole::Planner => "planner",
            AgentRole::Executor => "executor",
            AgentRole::Validator => "validator",
            AgentRole::Writer => "writer",
            AgentRole::Critic => "critic",
            AgentRole::Cleanup => "cleanup",
            AgentRole::Decision => "decision",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgentRole::ALL
            .into_iter()
            .find(|role| role.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown agent role: {}", s))
    }
}
