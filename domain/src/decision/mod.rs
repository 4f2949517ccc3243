//! Structured yes/no decisions.
//!
//! The decision model is asked for exactly one JSON object:
//!
//! ```json
//! {"result": true, "reason": "all deliverables exist"}
//! ```
//!
//! [`parse_decision`] accepts that object bare, inside a fenced code block,
//! or embedded in surrounding prose (the first balanced object wins).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A boolean answer and the model's reasoning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub result: bool,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecisionParseError {
    #[error("no JSON object found in decision output")]
    NoJsonObject,

    #[error("decision output does not match schema: {0}")]
    SchemaMismatch(String),
}

/// JSON schema the decision output must satisfy.
pub fn decision_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "result": {"type": "boolean"},
            "reason": {"type": "string"}
        },
        "required": ["result", "reason"],
        "additionalProperties": false
    })
}

/// Instruction block that frames a question for the decision model.
pub fn decision_prompt(context: &str, question: &str) -> String {
    format!(
        "You are a decision assistant. Analyze the context and return a true/false decision with reasoning.\n\n\
         Context:\n{context}\n\n\
         Question: {question}\n\n\
         Instructions:\n\
         1. Answer the question using only the context above.\n\
         2. Yes = true, No = false.\n\
         3. Give clear reasoning for the decision.\n\n\
         Return ONLY valid JSON matching this schema:\n{schema}",
        context = context,
        question = question,
        schema = decision_schema(),
    )
}

/// Parse decision output from a model.
pub fn parse_decision(text: &str) -> Result<Decision, DecisionParseError> {
    let candidate = extract_json_object(text).ok_or(DecisionParseError::NoJsonObject)?;
    parse_decision_value(serde_json::from_str(candidate).map_err(|e| {
        DecisionParseError::SchemaMismatch(e.to_string())
    })?)
}

/// Validate an already-decoded value (e.g. tool-call arguments).
pub fn parse_decision_value(value: serde_json::Value) -> Result<Decision, DecisionParseError> {
    let obj = value
        .as_object()
        .ok_or_else(|| DecisionParseError::SchemaMismatch("not an object".to_string()))?;

    let result = obj
        .get("result")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| {
            DecisionParseError::SchemaMismatch("'result' must be a boolean".to_string())
        })?;
    let reason = obj
        .get("reason")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DecisionParseError::SchemaMismatch("'reason' must be a string".to_string()))?;

    Ok(Decision {
        result,
        reason: reason.to_string(),
    })
}

/// First balanced `{...}` in `text`, ignoring braces inside string literals.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_object() {
        let d = parse_decision(r#"{"result": true, "reason": "done"}"#).unwrap();
        assert!(d.result);
        assert_eq!(d.reason, "done");
    }

    #[test]
    fn test_parse_fenced_and_prose() {
        let text = "Sure.\n```json\n{\"result\": false, \"reason\": \"step {2} missing\"}\n```\nThanks";
        let d = parse_decision(text).unwrap();
        assert!(!d.result);
        assert_eq!(d.reason, "step {2} missing");
    }

    #[test]
    fn test_escaped_quotes_in_reason() {
        let d = parse_decision(r#"{"result": true, "reason": "said \"ok}\""}"#).unwrap();
        assert_eq!(d.reason, "said \"ok}\"");
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(matches!(
            parse_decision(r#"{"result": "yes", "reason": "x"}"#),
            Err(DecisionParseError::SchemaMismatch(_))
        ));
        assert!(matches!(
            parse_decision(r#"{"result": true}"#),
            Err(DecisionParseError::SchemaMismatch(_))
        ));
        assert_eq!(parse_decision("yes"), Err(DecisionParseError::NoJsonObject));
        assert_eq!(parse_decision("{ unterminated"), Err(DecisionParseError::NoJsonObject));
    }

    #[test]
    fn test_prompt_embeds_schema_and_question() {
        let prompt = decision_prompt("ctx", "Is it done?");
        assert!(prompt.contains("Question: Is it done?"));
        assert!(prompt.contains("\"required\""));
    }
}
