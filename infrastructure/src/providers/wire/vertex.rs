//! Vertex AI / Gemini `generateContent` format.

use super::merge_extra;
use cadence_domain::{Choice, InvocationRequest, ProviderResponse, Role, TokenUsage, ToolCall};
use serde::Deserialize;
use serde_json::json;

pub(super) fn encode(model: &str, request: &InvocationRequest) -> serde_json::Value {
    let system: Vec<_> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| json!({"text": m.content}))
        .collect();
    let contents: Vec<_> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = if m.role == Role::Assistant { "model" } else { "user" };
            json!({"role": role, "parts": [{"text": m.content}]})
        })
        .collect();

    let mut body = json!({"model": model, "contents": contents});
    if !system.is_empty() {
        body["systemInstruction"] = json!({"parts": system});
    }

    let mut generation = serde_json::Map::new();
    if let Some(temperature) = request.temperature {
        generation.insert("temperature".into(), json!(temperature));
    }
    if let Some(max) = request.max_output_tokens {
        generation.insert("maxOutputTokens".into(), json!(max));
    }
    // Structured output maps onto Gemini's response schema.
    let mut extra = request.clone();
    if let Some(format) = extra.extra.remove("response_format")
        && let Some(schema) = format.pointer("/json_schema/schema")
    {
        generation.insert("responseMimeType".into(), json!("application/json"));
        generation.insert("responseSchema".into(), strip_unsupported(schema.clone()));
    }
    if !generation.is_empty() {
        body["generationConfig"] = serde_json::Value::Object(generation);
    }

    if !request.tools.is_empty() {
        let declarations: Vec<_> = request
            .tools
            .iter()
            .map(|t| json!({"name": t.name, "description": t.description, "parameters": t.parameters}))
            .collect();
        body["tools"] = json!([{"functionDeclarations": declarations}]);
    }
    merge_extra(&mut body, &extra);
    body
}

/// Gemini schemas reject `additionalProperties`.
fn strip_unsupported(mut schema: serde_json::Value) -> serde_json::Value {
    if let Some(map) = schema.as_object_mut() {
        map.remove("additionalProperties");
    }
    schema
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<Usage>,
    model_version: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
    function_call: Option<FunctionCall>,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Usage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    total_token_count: Option<u64>,
    cached_content_token_count: Option<u64>,
    thoughts_token_count: Option<u64>,
}

pub(super) fn decode(value: serde_json::Value) -> Result<ProviderResponse, serde_json::Error> {
    let response: Response = serde_json::from_value(value)?;

    let choices = response
        .candidates
        .into_iter()
        .map(|candidate| {
            let mut choice = Choice {
                finish_reason: candidate.finish_reason,
                ..Default::default()
            };
            for (index, part) in candidate.content.parts.into_iter().enumerate() {
                if let Some(text) = part.text
                    && !part.thought
                {
                    choice.content.push_str(&text);
                }
                if let Some(call) = part.function_call {
                    choice.tool_calls.push(ToolCall {
                        id: format!("{}_{}", call.name, index),
                        name: call.name,
                        arguments: call.args,
                    });
                }
            }
            choice
        })
        .collect();

    Ok(ProviderResponse {
        choices,
        usage: response.usage_metadata.map(|u| {
            TokenUsage::new(u.prompt_token_count, u.candidates_token_count, u.total_token_count)
                .with_cached_tokens(u.cached_content_token_count)
                .with_reasoning_tokens(u.thoughts_token_count)
        }),
        model: response.model_version,
    })
}
