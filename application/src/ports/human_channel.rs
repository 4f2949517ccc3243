//! Human channel port for approval gates.
//!
//! # Architecture
//!
//! Following the Ports and Adapters pattern:
//! - **Port**: [`HumanChannel`] - defined here in application layer
//! - **Adapter**: `ConsoleHumanChannel` - implemented in presentation layer
//!
//! # Flow
//!
//! ```text
//! ApprovalGate mints ApprovalRequest (attempt 1)
//!        ↓
//! HumanChannel::request() → Revise + feedback
//!        ↓
//! artifact regenerated with feedback folded in
//!        ↓
//! ApprovalGate mints ApprovalRequest (attempt 2, new id)
//!        ↓
//! HumanChannel::request() → Approve
//! ```
//!
//! # Built-in Implementations
//!
//! - [`AutoApproveChannel`] - Always approves
//! - [`AutoReviseChannel`] - Always asks for a revision

use async_trait::async_trait;
use cadence_domain::{ApprovalRequest, ApprovalResponse};

/// Error type for human channel operations.
///
/// These errors represent failures while talking to the reviewer, not
/// decisions made by the reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HumanChannelError {
    /// Reviewer or enclosing context cancelled (e.g., via Ctrl+C).
    Cancelled,
    /// Input/output error (e.g., terminal read failure).
    IoError(String),
    /// Response does not belong to the outstanding request.
    InvalidInput(String),
}

impl std::fmt::Display for HumanChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HumanChannelError::Cancelled => write!(f, "Operation cancelled"),
            HumanChannelError::IoError(msg) => write!(f, "I/O error: {}", msg),
            HumanChannelError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for HumanChannelError {}

/// Port for delivering approval requests to a human.
///
/// The call may block for as long as the reviewer needs. Callers that must
/// stay cancellable race it against a cancellation token.
#[async_trait]
pub trait HumanChannel: Send + Sync {
    async fn request(&self, request: &ApprovalRequest)
    -> Result<ApprovalResponse, HumanChannelError>;
}

/// Approves every request.
pub struct AutoApproveChannel;

#[async_trait]
impl HumanChannel for AutoApproveChannel {
    async fn request(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalResponse, HumanChannelError> {
        Ok(ApprovalResponse::approve(&request.id))
    }
}

/// Requests a revision every time, with fixed feedback.
pub struct AutoReviseChannel {
    feedback: String,
}

impl AutoReviseChannel {
    pub fn new(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
        }
    }
}

impl Default for AutoReviseChannel {
    fn default() -> Self {
        Self::new("Please revise: the artifact was not approved automatically.")
    }
}

#[async_trait]
impl HumanChannel for AutoReviseChannel {
    async fn request(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalResponse, HumanChannelError> {
        Ok(ApprovalResponse::revise(&request.id, &self.feedback))
    }
}
