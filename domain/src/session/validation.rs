//! Response shape validation.
//!
//! Decides whether a provider response can be accepted or must be treated as
//! a failure of the candidate that produced it.

use crate::session::response::ProviderResponse;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a raw provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationOutcome {
    /// Text content or a tool-call payload is present.
    Usable,
    /// Well-formed response with no text and no tool calls.
    EmptyNoToolCalls,
    /// Response missing or without any choice.
    MalformedShape,
}

impl ValidationOutcome {
    pub fn is_usable(&self) -> bool {
        matches!(self, ValidationOutcome::Usable)
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValidationOutcome::Usable => "usable",
            ValidationOutcome::EmptyNoToolCalls => "empty content with no tool calls",
            ValidationOutcome::MalformedShape => "malformed response shape",
        };
        write!(f, "{}", s)
    }
}

/// Outcome plus a human-readable reason for logs and aggregate errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub outcome: ValidationOutcome,
    pub detail: String,
}

/// Validate a provider response.
///
/// Rules are applied in order; the first match wins:
///
/// 1. no response → `MalformedShape`
/// 2. no choices → `MalformedShape`
/// 3. first choice has text → `Usable`
/// 4. first choice has tool calls or a function call → `Usable`
/// 5. otherwise → `EmptyNoToolCalls`
///
/// Rule 4 matters: tool-invocation responses legitimately carry no prose.
pub fn validate_response(response: Option<&ProviderResponse>) -> ValidationReport {
    let Some(response) = response else {
        return ValidationReport {
            outcome: ValidationOutcome::MalformedShape,
            detail: "provider returned no response".to_string(),
        };
    };

    let Some(choice) = response.first_choice() else {
        return ValidationReport {
            outcome: ValidationOutcome::MalformedShape,
            detail: "response contains no choices".to_string(),
        };
    };

    if choice.has_text() {
        return ValidationReport {
            outcome: ValidationOutcome::Usable,
            detail: format!("{} bytes of content", choice.content.len()),
        };
    }

    if choice.has_tool_payload() {
        let count = choice.tool_calls.len() + usize::from(choice.function_call.is_some());
        return ValidationReport {
            outcome: ValidationOutcome::Usable,
            detail: format!("{} tool call(s), no text", count),
        };
    }

    let detail = match &choice.finish_reason {
        Some(reason) => format!("empty content, finish reason '{}'", reason),
        None => "empty content".to_string(),
    };
    ValidationReport {
        outcome: ValidationOutcome::EmptyNoToolCalls,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::response::{Choice, FunctionCall, ToolCall};

    fn tool_call() -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: "search".to_string(),
            arguments: serde_json::json!({"q": "rust"}),
        }
    }

    #[test]
    fn test_missing_response_is_malformed() {
        let report = validate_response(None);
        assert_eq!(report.outcome, ValidationOutcome::MalformedShape);
    }

    #[test]
    fn test_no_choices_is_malformed() {
        let response = ProviderResponse::default();
        assert_eq!(
            validate_response(Some(&response)).outcome,
            ValidationOutcome::MalformedShape
        );
    }

    #[test]
    fn test_text_is_usable() {
        let response = ProviderResponse::from_text("done");
        assert!(validate_response(Some(&response)).outcome.is_usable());
    }

    #[test]
    fn test_tool_calls_without_text_are_usable() {
        for content in ["", "   ", "\n"] {
            let response = ProviderResponse {
                choices: vec![Choice {
                    content: content.to_string(),
                    tool_calls: vec![tool_call()],
                    ..Choice::default()
                }],
                ..ProviderResponse::default()
            };
            let report = validate_response(Some(&response));
            assert_eq!(report.outcome, ValidationOutcome::Usable, "content {:?}", content);
        }
    }

    #[test]
    fn test_legacy_function_call_is_usable() {
        let response = ProviderResponse {
            choices: vec![Choice {
                function_call: Some(FunctionCall {
                    name: "search".to_string(),
                    arguments: "{}".to_string(),
                }),
                ..Choice::default()
            }],
            ..ProviderResponse::default()
        };
        assert!(validate_response(Some(&response)).outcome.is_usable());
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        let response = ProviderResponse {
            choices: vec![Choice {
                content: "  ".to_string(),
                finish_reason: Some("length".to_string()),
                ..Choice::default()
            }],
            ..ProviderResponse::default()
        };
        let report = validate_response(Some(&response));
        assert_eq!(report.outcome, ValidationOutcome::EmptyNoToolCalls);
        assert!(report.detail.contains("length"));
    }

    #[test]
    fn test_only_first_choice_counts() {
        let response = ProviderResponse {
            choices: vec![Choice::default(), Choice::text("second has text")],
            ..ProviderResponse::default()
        };
        assert_eq!(
            validate_response(Some(&response)).outcome,
            ValidationOutcome::EmptyNoToolCalls
        );
    }
}
