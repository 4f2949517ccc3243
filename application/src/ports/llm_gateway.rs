//! LLM Gateway port
//!
//! Defines the interface for communicating with LLM providers. A gateway
//! opens a session for one candidate (initialization); the session then
//! serves generation requests.

use async_trait::async_trait;
use cadence_domain::{
    FailureKind, InvocationRequest, ModelCandidate, ProviderResponse,
    fallback::classification::classify_message,
};
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
///
/// Adapters pick the most specific variant they can; [`GatewayError::kind`]
/// maps each one onto the shared failure taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Provider responded with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Provider returned error: {0}")]
    ProviderReturned(String),

    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Missing credential: {0}")]
    MissingCredential(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport closed")]
    TransportClosed,

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::ConnectionError(_) | GatewayError::TransportClosed => {
                FailureKind::Transport
            }
            GatewayError::Timeout => FailureKind::Timeout,
            GatewayError::Status { status, .. } => FailureKind::from_status(*status),
            GatewayError::RateLimited(_) => FailureKind::RateLimited,
            GatewayError::ProviderReturned(_) => FailureKind::ProviderReturned,
            GatewayError::ContextLengthExceeded(_) => FailureKind::ContextLengthExceeded,
            GatewayError::ModelNotAvailable(_) => FailureKind::ModelUnavailable,
            GatewayError::MalformedResponse(_) => FailureKind::MalformedResponse,
            GatewayError::MissingCredential(_) => FailureKind::MissingCredential,
            GatewayError::UnknownProvider(_) => FailureKind::UnknownProvider,
            GatewayError::InvalidRequest(_) => FailureKind::InvalidRequest,
            GatewayError::Cancelled => FailureKind::Cancelled,
            GatewayError::Other(message) => classify_message(message),
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind().class() == cadence_domain::FailureClass::Configuration
    }
}

/// Gateway for LLM communication
///
/// This port defines how the application layer communicates with LLM providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Open a session serving `candidate`.
    ///
    /// Credential and routing checks belong here so they fail before any
    /// generation request is sent.
    async fn create_session(
        &self,
        candidate: &ModelCandidate,
    ) -> Result<Box<dyn LlmSession>, GatewayError>;
}

/// An active LLM session
#[async_trait]
pub trait LlmSession: Send + Sync {
    /// Get the candidate served by this session
    fn candidate(&self) -> &ModelCandidate;

    /// Run one generation request
    async fn generate(&self, request: &InvocationRequest) -> Result<ProviderResponse, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_domain::FailureClass;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            GatewayError::Status {
                status: 503,
                message: "down".into()
            }
            .kind(),
            FailureKind::ServerError { status: Some(503) }
        );
        assert_eq!(GatewayError::TransportClosed.kind(), FailureKind::Transport);
        assert_eq!(
            GatewayError::Other("429 too many requests".into()).kind(),
            FailureKind::RateLimited
        );
    }

    #[test]
    fn test_configuration_errors() {
        assert!(GatewayError::MissingCredential("OPENAI_API_KEY".into()).is_configuration());
        assert!(GatewayError::UnknownProvider("acme".into()).is_configuration());
        assert!(!GatewayError::RateLimited("slow".into()).is_configuration());
        assert_eq!(GatewayError::Cancelled.kind().class(), FailureClass::Cancelled);
    }
}
