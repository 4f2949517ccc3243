//! Anthropic messages format.

use super::merge_extra;
use cadence_domain::{Choice, InvocationRequest, ProviderResponse, Role, TokenUsage, ToolCall};
use serde::Deserialize;
use serde_json::json;

/// `max_tokens` is mandatory for this API.
const DEFAULT_MAX_TOKENS: u32 = 8192;

pub(super) fn encode(model: &str, request: &InvocationRequest) -> serde_json::Value {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let messages: Vec<_> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": messages,
        "max_tokens": request.max_output_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
    });
    if !system.is_empty() {
        body["system"] = json!(system.join("\n\n"));
    }
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect();
    }
    // The messages API has no response_format; structured output goes through the prompt.
    let mut extra = request.clone();
    extra.extra.remove("response_format");
    merge_extra(&mut body, &extra);
    body
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    content: Vec<Block>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    cache_read_input_tokens: Option<u64>,
}

pub(super) fn decode(value: serde_json::Value) -> Result<ProviderResponse, serde_json::Error> {
    let response: Response = serde_json::from_value(value)?;

    let mut choice = Choice {
        finish_reason: response.stop_reason,
        ..Default::default()
    };
    for block in response.content {
        match block {
            Block::Text { text } => choice.content.push_str(&text),
            Block::ToolUse { id, name, input } => choice.tool_calls.push(ToolCall {
                id,
                name,
                arguments: input,
            }),
            Block::Other => {}
        }
    }

    Ok(ProviderResponse {
        choices: vec![choice],
        usage: response.usage.map(|u| {
            TokenUsage::new(u.input_tokens, u.output_tokens, None)
                .with_cached_tokens(u.cache_read_input_tokens)
        }),
        model: response.model,
    })
}
