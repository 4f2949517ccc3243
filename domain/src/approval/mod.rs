//! Human approval domain
//!
//! Value objects exchanged between the approval gate and a human reviewer.
//! A fresh [`ApprovalRequest`] (with a new id) is minted for every revision
//! attempt; requests are never reused.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default revision budget for an approval gate.
pub const DEFAULT_MAX_REVISIONS: u32 = 5;

/// Gate state for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    AwaitingReview,
    Approved,
    Revise,
}

/// The reviewer's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Revise,
}

/// Request delivered to a human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: String,
    /// What is being approved, e.g. `plan_approval`.
    pub kind: String,
    /// 1-based revision attempt.
    pub attempt: u32,
    pub max_attempts: u32,
    pub artifact: String,
    /// Feedback that produced this artifact, if it is a revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prior_feedback: Option<String>,
}

impl ApprovalRequest {
    /// Build a request; the id is `<kind>_<attempt>_<nanos>`.
    pub fn new(
        kind: impl Into<String>,
        attempt: u32,
        max_attempts: u32,
        artifact: impl Into<String>,
        nanos: i64,
    ) -> Self {
        let kind = kind.into();
        Self {
            id: format!("{}_{}_{}", kind, attempt, nanos),
            kind,
            attempt,
            max_attempts,
            artifact: artifact.into(),
            prior_feedback: None,
        }
    }

    pub fn with_prior_feedback(mut self, feedback: Option<String>) -> Self {
        self.prior_feedback = feedback.filter(|f| !f.trim().is_empty());
        self
    }

    pub fn is_revision(&self) -> bool {
        self.attempt > 1
    }
}

/// Reviewer's response to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalResponse {
    pub request_id: String,
    pub decision: ApprovalDecision,
    #[serde(default)]
    pub feedback: String,
}

impl ApprovalResponse {
    pub fn approve(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            decision: ApprovalDecision::Approve,
            feedback: String::new(),
        }
    }

    pub fn revise(request_id: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            decision: ApprovalDecision::Revise,
            feedback: feedback.into(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == ApprovalDecision::Approve
    }

    pub fn state(&self) -> GateState {
        match self.decision {
            ApprovalDecision::Approve => GateState::Approved,
            ApprovalDecision::Revise => GateState::Revise,
        }
    }
}

/// Terminal outcome of a gate. Not being approved is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    pub kind: String,
    pub approved: bool,
    /// Number of requests sent to the reviewer.
    pub requests: u32,
    /// Artifact the pipeline continues with.
    pub artifact: String,
    /// Last reviewer feedback, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

/// How approval requests are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HilMode {
    /// Ask a human on the console.
    #[default]
    Interactive,
    AutoApprove,
    /// Always request a revision (dry runs).
    AutoRevise,
}

impl HilMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HilMode::Interactive => "interactive",
            HilMode::AutoApprove => "auto_approve",
            HilMode::AutoRevise => "auto_revise",
        }
    }
}

impl fmt::Display for HilMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HilMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "interactive" | "i" => Ok(HilMode::Interactive),
            "auto_approve" | "approve" => Ok(HilMode::AutoApprove),
            "auto_revise" | "revise" => Ok(HilMode::AutoRevise),
            other => Err(format!("unknown hil mode: {}", other)),
        }
    }
}

/// Where the pipeline pauses for approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPoint {
    Off,
    /// The plan of the first iteration.
    #[default]
    FirstPlan,
    EveryPlan,
}

impl ApprovalPoint {
    pub fn applies_to(&self, iteration: u32) -> bool {
        match self {
            ApprovalPoint::Off => false,
            ApprovalPoint::FirstPlan => iteration == 1,
            ApprovalPoint::EveryPlan => true,
        }
    }
}

impl FromStr for ApprovalPoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "off" | "none" => Ok(ApprovalPoint::Off),
            "first_plan" => Ok(ApprovalPoint::FirstPlan),
            "every_plan" => Ok(ApprovalPoint::EveryPlan),
            other => Err(format!("unknown approval point: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_format() {
        let req = ApprovalRequest::new("plan_approval", 2, 5, "plan", 1_712_345_678);
        assert_eq!(req.id, "plan_approval_2_1712345678");
        assert!(req.is_revision());
    }

    #[test]
    fn test_blank_prior_feedback_dropped() {
        let req = ApprovalRequest::new("plan_approval", 1, 5, "plan", 1)
            .with_prior_feedback(Some("  ".to_string()));
        assert_eq!(req.prior_feedback, None);
    }

    #[test]
    fn test_response_state() {
        assert_eq!(ApprovalResponse::approve("x").state(), GateState::Approved);
        let revise = ApprovalResponse::revise("x", "tighten scope");
        assert_eq!(revise.state(), GateState::Revise);
        assert!(!revise.is_approved());
    }

    #[test]
    fn test_parse_modes() {
        assert_eq!("auto-approve".parse::<HilMode>().unwrap(), HilMode::AutoApprove);
        assert_eq!("revise".parse::<HilMode>().unwrap(), HilMode::AutoRevise);
        assert!("sometimes".parse::<HilMode>().is_err());
        assert_eq!("every-plan".parse::<ApprovalPoint>().unwrap(), ApprovalPoint::EveryPlan);
    }

    #[test]
    fn test_approval_point_applies() {
        assert!(ApprovalPoint::FirstPlan.applies_to(1));
        assert!(!ApprovalPoint::FirstPlan.applies_to(2));
        assert!(ApprovalPoint::EveryPlan.applies_to(7));
        assert!(!ApprovalPoint::Off.applies_to(1));
    }
}
