//! Value objects for produce → judge retry loops.

use serde::{Deserialize, Serialize};

/// Default attempt budget for a step.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// A judge's decision on one produced output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    pub feedback: String,
}

impl Verdict {
    pub fn pass(feedback: impl Into<String>) -> Self {
        Self {
            passed: true,
            feedback: feedback.into(),
        }
    }

    pub fn fail(feedback: impl Into<String>) -> Self {
        Self {
            passed: false,
            feedback: feedback.into(),
        }
    }
}

/// One produce/judge round. Only lives inside a single retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub attempt: u32,
    /// Short description of what was produced, or the production error.
    pub summary: String,
    pub verdict: Verdict,
}

impl AttemptRecord {
    /// Feedback for the next attempt, framed so the producer can find it.
    pub fn feedback_block(&self) -> String {
        format!(
            "## Validation Feedback (Retry Attempt {}):\n{}",
            self.attempt, self.verdict.feedback
        )
    }
}

/// Result of a whole retry loop.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    /// Last produced output, if any attempt produced one.
    pub output: Option<T>,
    pub passed: bool,
    /// Attempt number of the final round (1-based).
    pub attempts: u32,
    /// Feedback from the final verdict.
    pub feedback: String,
}

impl<T> RetryOutcome<T> {
    pub fn is_success(&self) -> bool {
        self.passed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_block_names_attempt() {
        let record = AttemptRecord {
            attempt: 2,
            summary: "draft".to_string(),
            verdict: Verdict::fail("missing evidence for step 3"),
        };
        assert_eq!(
            record.feedback_block(),
            "## Validation Feedback (Retry Attempt 2):\nmissing evidence for step 3"
        );
    }
}
