//! Raw provider responses and the accepted invocation result.
//!
//! # Two shapes
//!
//! ```text
//! LlmSession::generate()      → ProviderResponse   (may be empty or malformed)
//!                     validate_response() == Usable
//!                                 ↓
//!                      InvocationResult            (accepted, immutable)
//! ```

use crate::core::candidate::ModelCandidate;
use crate::session::usage::TokenUsage;
use serde::{Deserialize, Serialize};

/// A structured tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

/// Single-function call payload from providers that predate parallel tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON-encoded argument string, as the provider sent it.
    #[serde(default)]
    pub arguments: String,
}

/// One completion alternative from a provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl Choice {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::default()
        }
    }

    pub fn has_text(&self) -> bool {
        !self.content.trim().is_empty()
    }

    pub fn has_tool_payload(&self) -> bool {
        !self.tool_calls.is_empty() || self.function_call.is_some()
    }
}

/// What a provider session returned, before shape validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Model id as reported back by the provider, when it differs from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ProviderResponse {
    pub fn from_text(content: impl Into<String>) -> Self {
        Self {
            choices: vec![Choice::text(content)],
            ..Self::default()
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn first_choice(&self) -> Option<&Choice> {
        self.choices.first()
    }
}

/// A successful, validated model call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub usage: TokenUsage,
    pub candidate: ModelCandidate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

impl InvocationResult {
    /// Take the first choice of an already-validated response.
    ///
    /// A legacy `function_call` is surfaced as a regular tool call so callers
    /// only look at one list.
    pub fn from_response(response: ProviderResponse, candidate: ModelCandidate) -> Self {
        let usage = response.usage.unwrap_or_default();
        let choice = response.choices.into_iter().next().unwrap_or_default();

        let mut tool_calls = choice.tool_calls;
        if let Some(call) = choice.function_call {
            let arguments = serde_json::from_str(&call.arguments)
                .unwrap_or(serde_json::Value::String(call.arguments));
            tool_calls.push(ToolCall {
                id: format!("function_call_{}", call.name),
                name: call.name,
                arguments,
            });
        }

        Self {
            content: choice.content,
            tool_calls,
            usage,
            candidate,
            finish_reason: choice.finish_reason,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
