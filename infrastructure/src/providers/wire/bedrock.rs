//! Bedrock Converse format.

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
    let messages: Vec<_> = request
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| json!({"role": m.role, "content": [{"text": m.content}]}))
        .collect();

    let mut body = json!({"modelId": model, "messages": messages});
    if !system.is_empty() {
        body["system"] = json!(system);
    }

    let mut inference = serde_json::Map::new();
    if let Some(max) = request.max_output_tokens {
        inference.insert("maxTokens".into(), json!(max));
    }
    if let Some(temperature) = request.temperature {
        inference.insert("temperature".into(), json!(temperature));
    }
    if !inference.is_empty() {
        body["inferenceConfig"] = serde_json::Value::Object(inference);
    }

    if !request.tools.is_empty() {
        let tools: Vec<_> = request
            .tools
            .iter()
            .map(|t| {
                json!({"toolSpec": {
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": {"json": t.parameters},
                }})
            })
            .collect();
        body["toolConfig"] = json!({"tools": tools});
    }
    let mut extra = request.clone();
    extra.extra.remove("response_format");
    merge_extra(&mut body, &extra);
    body
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    output: Option<Output>,
    stop_reason: Option<String>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Output {
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Vec<Block>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Block {
    text: Option<String>,
    tool_use: Option<ToolUse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolUse {
    tool_use_id: String,
    name: String,
    #[serde(default)]
    input: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Usage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
    total_tokens: Option<u64>,
    cache_read_input_tokens: Option<u64>,
}

pub(super) fn decode(value: serde_json::Value) -> Result<ProviderResponse, serde_json::Error> {
    let response: Response = serde_json::from_value(value)?;

    let blocks = response
        .output
        .and_then(|o| o.message)
        .map(|m| m.content)
        .unwrap_or_default();

    // No output message at all means no choice; the validator treats that as malformed.
    let choices = if blocks.is_empty() {
        Vec::new()
    } else {
        let mut choice = Choice {
            finish_reason: response.stop_reason,
            ..Default::default()
        };
        for block in blocks {
            if let Some(text) = block.text {
                choice.content.push_str(&text);
            }
            if let Some(tool) = block.tool_use {
                choice.tool_calls.push(ToolCall {
                    id: tool.tool_use_id,
                    name: tool.name,
                    arguments: tool.input,
                });
            }
        }
        vec![choice]
    };

    Ok(ProviderResponse {
        choices,
        usage: response.usage.map(|u| {
            TokenUsage::new(u.input_tokens, u.output_tokens, u.total_tokens)
                .with_cached_tokens(u.cache_read_input_tokens)
        }),
        model: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_converse_request() {
        let request = InvocationRequest::prompt(Some("sys"), "go").with_max_output_tokens(1024);
        let body = encode("us.anthropic.claude-sonnet-4-20250514-v1:0", &request);
        assert_eq!(body["modelId"], "us.anthropic.claude-sonnet-4-20250514-v1:0");
        assert_eq!(body["system"][0]["text"], "sys");
        assert_eq!(body["messages"][0]["content"][0]["text"], "go");
        assert_eq!(body["inferenceConfig"]["maxTokens"], 1024);
    }

    #[test]
    fn test_decode_converse_response() {
        let body = json!({
            "output": {"message": {"role": "assistant", "content": [
                {"text": "done"},
                {"toolUse": {"toolUseId": "t1", "name": "save", "input": {}}}
            ]}},
            "stopReason": "tool_use",
            "usage": {"inputTokens": 9, "outputTokens": 1, "totalTokens": 10}
        });
        let response = decode(body).unwrap();
        let choice = response.first_choice().unwrap();
        assert_eq!(choice.content, "done");
        assert_eq!(choice.tool_calls[0].id, "t1");
        assert_eq!(response.usage.unwrap().total_tokens, 10);
    }

    #[test]
    fn test_missing_output_has_no_choices() {
        let response = decode(json!({"usage": {"inputTokens": 1, "outputTokens": 0}})).unwrap();
        assert!(response.choices.is_empty());
    }
}
