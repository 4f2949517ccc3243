//! Failure taxonomy for model calls.
//!
//! Adapters report a structured [`FailureKind`]; the invoker only asks for
//! its [`FailureClass`] to decide whether the next candidate is worth trying.

use serde::{Deserialize, Serialize};
use std::fmt;

/// What went wrong with one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Connection refused/reset, EOF, broken pipe, stream interrupted.
    Transport,
    Timeout,
    /// 5xx-class response.
    ServerError { status: Option<u16> },
    RateLimited,
    /// Upstream aggregator reported a failure of the underlying provider.
    ProviderReturned,
    ContextLengthExceeded,
    /// The provider does not serve this model (anymore).
    ModelUnavailable,
    /// Response arrived but failed shape validation.
    MalformedResponse,
    EmptyResponse,
    MissingCredential,
    UnknownProvider,
    /// The request itself is structurally invalid for any model.
    InvalidRequest,
    Cancelled,
    /// Failure with no recognizable signal.
    Unclassified,
}

/// How the invoker treats a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Try the next candidate.
    FallbackEligible,
    /// Surface immediately; another candidate would fail the same way.
    Configuration,
    /// Stop everything.
    Cancelled,
}

impl FailureKind {
    pub fn class(&self) -> FailureClass {
        match self {
            FailureKind::MissingCredential
            | FailureKind::UnknownProvider
            | FailureKind::InvalidRequest => FailureClass::Configuration,
            FailureKind::Cancelled => FailureClass::Cancelled,
            _ => FailureClass::FallbackEligible,
        }
    }

    pub fn is_fallback_eligible(&self) -> bool {
        self.class() == FailureClass::FallbackEligible
    }

    /// Map an HTTP-style status code to a kind.
    pub fn from_status(status: u16) -> FailureKind {
        match status {
            401 | 403 => FailureKind::MissingCredential,
            400 | 422 => FailureKind::InvalidRequest,
            404 => FailureKind::ModelUnavailable,
            408 => FailureKind::Timeout,
            413 => FailureKind::ContextLengthExceeded,
            429 => FailureKind::RateLimited,
            500..=599 => FailureKind::ServerError {
                status: Some(status),
            },
            _ => FailureKind::Unclassified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transport => "transport",
            FailureKind::Timeout => "timeout",
            FailureKind::ServerError { .. } => "server_error",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::ProviderReturned => "provider_returned",
            FailureKind::ContextLengthExceeded => "context_length_exceeded",
            FailureKind::ModelUnavailable => "model_unavailable",
            FailureKind::MalformedResponse => "malformed_response",
            FailureKind::EmptyResponse => "empty_response",
            FailureKind::MissingCredential => "missing_credential",
            FailureKind::UnknownProvider => "unknown_provider",
            FailureKind::InvalidRequest => "invalid_request",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::ServerError {
                status: Some(status),
            } => write!(f, "server_error({})", status),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

/// Classify a free-text error message.
///
/// Only for adapters that never see a structured status (for example a
/// child process that prints to stderr). Structured kinds are always
/// preferred over this. Text never yields [`FailureKind::Cancelled`]; only
/// the run's cancellation token does. Transient markers are checked before
/// credential markers so a retryable failure is never treated as fatal.
pub fn classify_message(message: &str) -> FailureKind {
    let msg = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| msg.contains(n));
    let has_code = |code: u16| contains_status(&msg, code);

    if has(&[
        "context length",
        "context_length",
        "maximum context",
        "max tokens",
        "max_tokens",
        "too many tokens",
    ]) {
        return FailureKind::ContextLengthExceeded;
    }
    if has_code(429) || has(&["rate limit", "rate-limit", "throttl", "too many requests"]) {
        return FailureKind::RateLimited;
    }
    if has(&["provider returned error"]) {
        return FailureKind::ProviderReturned;
    }
    for code in [500u16, 502, 503, 504] {
        if has_code(code) {
            return FailureKind::ServerError { status: Some(code) };
        }
    }
    if has(&["bad gateway", "service unavailable", "internal server error", "internal error"]) {
        return FailureKind::ServerError { status: None };
    }
    if has(&["gateway timeout", "timed out", "timeout", "deadline exceeded"]) {
        return FailureKind::Timeout;
    }
    if has(&[
        "eof",
        "connection refused",
        "connection reset",
        "broken pipe",
        "dial tcp",
        "stream error",
        "stream closed",
    ]) {
        return FailureKind::Transport;
    }
    if has_code(401)
        || has_code(403)
        || has(&["missing credential", "api key", "unauthorized", "forbidden"])
    {
        return FailureKind::MissingCredential;
    }
    if has(&["model not found", "model_not_found", "model not available", "does not exist"]) {
        return FailureKind::ModelUnavailable;
    }
    if has(&["empty content", "empty response", "no choices"]) {
        return FailureKind::EmptyResponse;
    }
    if has_code(400) || has(&["invalid request", "invalid_request", "bad request"]) {
        return FailureKind::InvalidRequest;
    }
    FailureKind::Unclassified
}

/// Whether `msg` carries `code` as a standalone number, not inside a port,
/// address or byte count.
fn contains_status(msg: &str, code: u16) -> bool {
    let needle = code.to_string();
    let bytes = msg.as_bytes();
    msg.match_indices(&needle).any(|(at, _)| {
        let end = at + needle.len();
        let before = at.checked_sub(1).map(|i| bytes[i]);
        let after = bytes.get(end).copied();
        let opens = before.is_none_or(|b| !b.is_ascii_alphanumeric() && b != b'.' && b != b':');
        let closes = after.is_none_or(|b| !b.is_ascii_alphanumeric());
        opens && closes
    })
}
