//! Approval gate: hold an artifact until a human approves it.
//!
//! Each round mints a fresh [`ApprovalRequest`], waits on the
//! [`HumanChannel`] and either finishes (approve) or regenerates the
//! artifact with the reviewer's feedback (revise). After `max_revisions`
//! requests the gate finishes unapproved and the pipeline continues with
//! the latest artifact.

use crate::ports::event_sink::EventFanout;
use crate::ports::human_channel::{HumanChannel, HumanChannelError};
use crate::use_cases::agent_step::StepError;
use crate::use_cases::shared::{cancellable, now_nanos};
use async_trait::async_trait;
use cadence_domain::approval::DEFAULT_MAX_REVISIONS;
use cadence_domain::{ApprovalOutcome, ApprovalRequest, RunEvent};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Regenerates an artifact from reviewer feedback.
#[async_trait]
pub trait ArtifactReviser: Send + Sync {
    async fn revise(&self, artifact: &str, feedback: &str, attempt: u32) -> Result<String, StepError>;
}

#[derive(Error, Debug)]
pub enum ApprovalError {
    #[error("Approval cancelled")]
    Cancelled,

    #[error("Human channel failed: {0}")]
    Channel(HumanChannelError),

    #[error("Revision failed: {0}")]
    Revision(StepError),
}

impl ApprovalError {
    pub fn is_cancelled(&self) -> bool {
        match self {
            ApprovalError::Cancelled => true,
            ApprovalError::Channel(e) => *e == HumanChannelError::Cancelled,
            ApprovalError::Revision(e) => e.is_cancelled(),
        }
    }
}

pub struct ApprovalGate {
    channel: Arc<dyn HumanChannel>,
    max_revisions: u32,
    events: EventFanout,
}

impl ApprovalGate {
    pub fn new(channel: Arc<dyn HumanChannel>) -> Self {
        Self {
            channel,
            max_revisions: DEFAULT_MAX_REVISIONS,
            events: EventFanout::default(),
        }
    }

    /// Bound on requests per gate. 0 is treated as 1.
    pub fn with_max_revisions(mut self, max: u32) -> Self {
        self.max_revisions = max.max(1);
        self
    }

    pub fn with_events(mut self, events: EventFanout) -> Self {
        self.events = events;
        self
    }

    pub async fn review<R>(
        &self,
        kind: &str,
        artifact: String,
        reviser: &R,
        cancellation_token: &Option<CancellationToken>,
    ) -> Result<ApprovalOutcome, ApprovalError>
    where
        R: ArtifactReviser + ?Sized,
    {
        let mut artifact = artifact;
        let mut prior_feedback: Option<String> = None;

        for attempt in 1..=self.max_revisions {
            let request = ApprovalRequest::new(kind, attempt, self.max_revisions, artifact.clone(), now_nanos())
                .with_prior_feedback(prior_feedback.clone());

            self.events.publish(&RunEvent::ApprovalRequested {
                request_id: request.id.clone(),
                attempt,
            });

            let response = match cancellable(cancellation_token, self.channel.request(&request)).await {
                None | Some(Err(HumanChannelError::Cancelled)) => return Err(ApprovalError::Cancelled),
                Some(Err(e)) => return Err(ApprovalError::Channel(e)),
                Some(Ok(response)) => response,
            };
            if response.request_id != request.id {
                return Err(ApprovalError::Channel(HumanChannelError::InvalidInput(format!(
                    "response for '{}' does not match request '{}'",
                    response.request_id, request.id
                ))));
            }

            self.events.publish(&RunEvent::ApprovalResolved {
                request_id: request.id.clone(),
                approved: response.is_approved(),
            });

            if response.is_approved() {
                info!("{} approved on request {}/{}", kind, attempt, self.max_revisions);
                return Ok(ApprovalOutcome {
                    kind: kind.to_string(),
                    approved: true,
                    requests: attempt,
                    artifact,
                    feedback: prior_feedback,
                });
            }

            let feedback = response.feedback;
            if attempt < self.max_revisions {
                match reviser.revise(&artifact, &feedback, attempt + 1).await {
                    Ok(revised) => artifact = revised,
                    Err(e) if e.is_fatal() => return Err(ApprovalError::Revision(e)),
                    Err(e) => warn!("{}: revision {} failed, keeping previous artifact: {}", kind, attempt + 1, e),
                }
            }
            prior_feedback = Some(feedback);
        }

        info!("{} not approved after {} requests", kind, self.max_revisions);
        Ok(ApprovalOutcome {
            kind: kind.to_string(),
            approved: false,
            requests: self.max_revisions,
            artifact,
            feedback: prior_feedback,
        })
    }
}
