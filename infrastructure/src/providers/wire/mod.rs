//! Provider wire formats.
//!
//! Each format converts an [`InvocationRequest`] into the provider's native
//! JSON body and maps the native response (choices and usage) back into a
//! [`ProviderResponse`]. Usage normalization lives with the format that
//! defines the fields.

mod anthropic;
mod bedrock;
mod openai;
mod vertex;

use cadence_application::ports::llm_gateway::GatewayError;
use cadence_domain::fallback::classification::classify_message;
use cadence_domain::{InvocationRequest, ProviderId, ProviderResponse};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireFormat {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Bedrock,
    Vertex,
}

impl WireFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            WireFormat::OpenAi => "openai",
            WireFormat::Anthropic => "anthropic",
            WireFormat::Bedrock => "bedrock",
            WireFormat::Vertex => "vertex",
        }
    }

    /// Native format of a provider. OpenRouter and custom providers speak
    /// the OpenAI chat format.
    pub fn for_provider(provider: &ProviderId) -> Self {
        match provider {
            ProviderId::Anthropic => WireFormat::Anthropic,
            ProviderId::Bedrock => WireFormat::Bedrock,
            ProviderId::Vertex => WireFormat::Vertex,
            ProviderId::OpenAi | ProviderId::OpenRouter | ProviderId::Custom(_) => {
                WireFormat::OpenAi
            }
        }
    }

    pub fn encode(&self, model: &str, request: &InvocationRequest) -> serde_json::Value {
        match self {
            WireFormat::OpenAi => openai::encode(model, request),
            WireFormat::Anthropic => anthropic::encode(model, request),
            WireFormat::Bedrock => bedrock::encode(model, request),
            WireFormat::Vertex => vertex::encode(model, request),
        }
    }

    /// Decode a successful response body.
    ///
    /// A body carrying an error object is returned as that error, since some
    /// providers report failures with a success status.
    pub fn decode(&self, body: &[u8]) -> Result<ProviderResponse, GatewayError> {
        let value: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| GatewayError::MalformedResponse(format!("invalid JSON: {}", e)))?;
        if let Some(error) = extract_error(&value) {
            return Err(error);
        }
        let decoded = match self {
            WireFormat::OpenAi => openai::decode(value),
            WireFormat::Anthropic => anthropic::decode(value),
            WireFormat::Bedrock => bedrock::decode(value),
            WireFormat::Vertex => vertex::decode(value),
        };
        decoded.map_err(|e| {
            GatewayError::MalformedResponse(format!("{} response: {}", self.as_str(), e))
        })
    }
}

impl std::fmt::Display for WireFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WireFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openrouter" => Ok(WireFormat::OpenAi),
            "anthropic" => Ok(WireFormat::Anthropic),
            "bedrock" | "converse" => Ok(WireFormat::Bedrock),
            "vertex" | "gemini" => Ok(WireFormat::Vertex),
            other => Err(format!("unknown wire format '{}'", other)),
        }
    }
}

/// Find a provider error object in a response body.
///
/// Recognizes `{"error": {...}}` (OpenAI, OpenRouter, Vertex, Anthropic)
/// and Bedrock's `{"__type": ..., "message": ...}`. An `"error": null`
/// field on a successful body is not an error.
pub fn extract_error(value: &serde_json::Value) -> Option<GatewayError> {
    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| error.as_str())
            .unwrap_or("provider returned an error")
            .to_string();
        let status = error
            .get("code")
            .or_else(|| error.get("status"))
            .and_then(|c| c.as_u64())
            .and_then(|c| u16::try_from(c).ok());
        let kind = error
            .get("type")
            .or_else(|| error.get("status"))
            .and_then(|t| t.as_str())
            .unwrap_or_default();
        return Some(error_from_parts(status, kind, message));
    }

    let bedrock_type = value.get("__type").and_then(|t| t.as_str())?;
    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(|m| m.as_str())
        .unwrap_or(bedrock_type)
        .to_string();
    Some(error_from_parts(None, bedrock_type, message))
}

fn error_from_parts(status: Option<u16>, kind: &str, message: String) -> GatewayError {
    if let Some(status) = status {
        return GatewayError::Status { status, message };
    }
    let hint = format!("{} {}", kind, message).to_lowercase();
    if hint.contains("throttl") || hint.contains("rate_limit") || hint.contains("resource_exhausted") {
        return GatewayError::RateLimited(message);
    }
    if hint.contains("overloaded") || hint.contains("unavailable") {
        return GatewayError::Status {
            status: 503,
            message,
        };
    }
    match classify_message(&hint) {
        cadence_domain::FailureKind::Unclassified => GatewayError::ProviderReturned(message),
        _ => GatewayError::Other(format!("{}: {}", kind, message)),
    }
}

/// Arguments of a tool call as sent by the provider: a JSON string or an object.
pub(crate) fn parse_arguments(raw: serde_json::Value) -> serde_json::Value {
    match raw {
        serde_json::Value::String(s) => {
            serde_json::from_str(&s).unwrap_or(serde_json::Value::String(s))
        }
        other => other,
    }
}

/// Copy `extra` request fields into the top level of a body.
pub(crate) fn merge_extra(body: &mut serde_json::Value, request: &InvocationRequest) {
    if let Some(map) = body.as_object_mut() {
        for (key, value) in &request.extra {
            map.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_domain::FailureKind;

    #[test]
    fn test_format_for_provider() {
        assert_eq!(WireFormat::for_provider(&ProviderId::OpenRouter), WireFormat::OpenAi);
        assert_eq!(WireFormat::for_provider(&ProviderId::Vertex), WireFormat::Vertex);
        assert_eq!("gemini".parse::<WireFormat>(), Ok(WireFormat::Vertex));
        assert!("soap".parse::<WireFormat>().is_err());
    }

    #[test]
    fn test_extract_openrouter_error() {
        let body = serde_json::json!({"error": {"code": 502, "message": "upstream down"}});
        let error = extract_error(&body).unwrap();
        assert_eq!(error.kind(), FailureKind::ServerError { status: Some(502) });
    }

    #[test]
    fn test_extract_anthropic_overloaded() {
        let body = serde_json::json!({
            "type": "error",
            "error": {"type": "overloaded_error", "message": "Overloaded"}
        });
        let error = extract_error(&body).unwrap();
        assert_eq!(error.kind(), FailureKind::ServerError { status: Some(503) });
    }

    #[test]
    fn test_extract_bedrock_throttling() {
        let body = serde_json::json!({"__type": "ThrottlingException", "message": "slow down"});
        assert_eq!(extract_error(&body).unwrap().kind(), FailureKind::RateLimited);
    }

    #[test]
    fn test_error_body_with_success_status() {
        let body = br#"{"error": {"message": "Provider returned error"}}"#;
        let err = WireFormat::OpenAi.decode(body).unwrap_err();
        assert_eq!(err.kind(), FailureKind::ProviderReturned);
    }

    #[test]
    fn test_null_error_field_is_success() {
        let body = br#"{"choices":[{"message":{"content":"fine answer"}}],"error":null}"#;
        let response = WireFormat::OpenAi.decode(body).unwrap();
        assert_eq!(response.choices[0].content, "fine answer");
        assert!(extract_error(&serde_json::json!({"error": null})).is_none());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let err = WireFormat::Anthropic.decode(b"<html>").unwrap_err();
        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }
}
