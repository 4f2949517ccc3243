//! OpenAI chat-completions format (also OpenRouter).

use super::{merge_extra, parse_arguments};
use cadence_domain::{Choice, FunctionCall, InvocationRequest, ProviderResponse, TokenUsage, ToolCall};
use serde::Deserialize;
use serde_json::json;

pub(super) fn encode(model: &str, request: &InvocationRequest) -> serde_json::Value {
    let messages: Vec<_> = request
        .messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({"model": model, "messages": messages});
    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }
    if let Some(max) = request.max_output_tokens {
        body["max_tokens"] = json!(max);
    }
    if !request.tools.is_empty() {
        body["tools"] = request
            .tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();
    }
    merge_extra(&mut body, request);
    body
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    choices: Vec<WireChoice>,
    usage: Option<Usage>,
    model: Option<String>,
}

#[derive(Deserialize)]
struct WireChoice {
    #[serde(default)]
    message: WireMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct WireMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
    function_call: Option<WireFunction>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    total_tokens: Option<u64>,
    /// OpenRouter
    cache_discount: Option<f64>,
    prompt_tokens_details: Option<PromptDetails>,
    completion_tokens_details: Option<CompletionDetails>,
}

#[derive(Deserialize)]
struct PromptDetails {
    cached_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct CompletionDetails {
    reasoning_tokens: Option<u64>,
}

impl From<Usage> for TokenUsage {
    fn from(u: Usage) -> Self {
        TokenUsage::new(u.prompt_tokens, u.completion_tokens, u.total_tokens)
            .with_cache_discount(u.cache_discount)
            .with_cached_tokens(u.prompt_tokens_details.and_then(|d| d.cached_tokens))
            .with_reasoning_tokens(u.completion_tokens_details.and_then(|d| d.reasoning_tokens))
    }
}

pub(super) fn decode(value: serde_json::Value) -> Result<ProviderResponse, serde_json::Error> {
    let response: Response = serde_json::from_value(value)?;
    let choices = response
        .choices
        .into_iter()
        .map(|c| Choice {
            content: c.message.content.unwrap_or_default(),
            tool_calls: c
                .message
                .tool_calls
                .into_iter()
                .map(|t| ToolCall {
                    id: t.id,
                    name: t.function.name,
                    arguments: parse_arguments(t.function.arguments),
                })
                .collect(),
            function_call: c.message.function_call.map(|f| FunctionCall {
                name: f.name,
                arguments: match f.arguments {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
            }),
            finish_reason: c.finish_reason,
        })
        .collect();

    Ok(ProviderResponse {
        choices,
        usage: response.usage.map(TokenUsage::from),
        model: response.model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_domain::ToolDeclaration;

    #[test]
    fn test_encode_request() {
        let request = InvocationRequest::prompt(Some("be terse"), "hi")
            .with_temperature(0.0)
            .with_tool(ToolDeclaration {
                name: "decide".into(),
                description: "answer".into(),
                parameters: json!({"type": "object"}),
            })
            .with_extra("response_format", json!({"type": "json_object"}));

        let body = encode("gpt-4.1-mini", &request);
        assert_eq!(body["model"], "gpt-4.1-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["tools"][0]["function"]["name"], "decide");
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_decode_openrouter_usage_and_tool_calls() {
        let body = json!({
            "model": "moonshotai/kimi-k2",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "write_file", "arguments": "{\"path\":\"a.md\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {
                "prompt_tokens": 120,
                "completion_tokens": 30,
                "total_tokens": 150,
                "cache_discount": 0.25,
                "prompt_tokens_details": {"cached_tokens": 100},
                "completion_tokens_details": {"reasoning_tokens": 0}
            }
        });

        let response = decode(body).unwrap();
        let choice = response.first_choice().unwrap();
        assert!(choice.content.is_empty());
        assert_eq!(choice.tool_calls[0].arguments["path"], "a.md");

        let usage = response.usage.unwrap();
        assert_eq!(usage.total_tokens, 150);
        assert_eq!(usage.cache_discount, Some(0.25));
        assert_eq!(usage.cached_tokens, Some(100));
        assert_eq!(usage.reasoning_tokens, None);
    }

    #[test]
    fn test_decode_missing_total() {
        let body = json!({
            "choices": [{"message": {"content": "ok"}}],
            "usage": {"prompt_tokens": 3, "completion_tokens": 4}
        });
        let usage = decode(body).unwrap().usage.unwrap();
        assert_eq!(usage.total_tokens, 7);
    }
}
