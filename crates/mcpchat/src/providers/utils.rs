use anyhow::{anyhow, Result};
use regex::Regex;
use serde_json::{json, Value};

use super::base::{Completion, Usage};
use crate::errors::ProviderError;
use crate::models::message::{Message, ToolResponse};
use crate::models::tool::{Tool, ToolCall};

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        match message {
            Message::User { text } => messages_spec.push(json!({
                "role": "user",
                "content": text,
            })),
            Message::Assistant { text, tool_calls } => {
                let mut converted = json!({ "role": "assistant" });
                if let Some(text) = text.as_deref().filter(|t| !t.is_empty()) {
                    converted["content"] = json!(text);
                }
                if !tool_calls.is_empty() {
                    let calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": sanitize_function_name(&call.name),
                                    "arguments": call.arguments,
                                }
                            })
                        })
                        .collect();
                    converted["tool_calls"] = json!(calls);
                }
                if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
                    messages_spec.push(converted);
                }
            }
            Message::ToolResult(response) => messages_spec.push(json!({
                "role": "tool",
                "content": tool_response_text(response),
                "tool_call_id": response.id,
            })),
        }
    }

    messages_spec
}

/// Convert internal Message format to Ollama's native chat message specification.
/// Ollama wants tool arguments as objects and has no tool call ids.
pub fn messages_to_ollama_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| match message {
            Message::User { text } => json!({ "role": "user", "content": text }),
            Message::Assistant { text, tool_calls } => {
                let mut converted = json!({
                    "role": "assistant",
                    "content": text.clone().unwrap_or_default(),
                });
                if !tool_calls.is_empty() {
                    let calls: Vec<Value> = tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "function": {
                                    "name": call.name,
                                    "arguments": call.decoded_arguments(),
                                }
                            })
                        })
                        .collect();
                    converted["tool_calls"] = json!(calls);
                }
                converted
            }
            Message::ToolResult(response) => json!({
                "role": "tool",
                "content": tool_response_text(response),
                "tool_name": response.name,
            }),
        })
        .collect()
}

/// A tool result error is shown as output so the model can interpret the error message
fn tool_response_text(response: &ToolResponse) -> String {
    match &response.result {
        Ok(output) => output.clone(),
        Err(e) => format!("The tool call returned the following error:\n{}", e),
    }
}

/// Convert internal Tool format to OpenAI's API tool specification.
/// Ollama accepts the same shape.
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to a completion
pub fn openai_response_to_completion(response: &Value) -> Result<Completion, ProviderError> {
    let original = response
        .pointer("/choices/0/message")
        .ok_or_else(|| ProviderError::InvalidResponse("no message in response".to_string()))?;

    let text = original
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string);

    let tool_calls = original
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.iter().map(parse_tool_call).collect())
        .unwrap_or_default();

    Ok(Completion {
        text,
        tool_calls,
        usage: get_usage(response),
    })
}

/// Convert Ollama's native chat response to a completion
pub fn ollama_response_to_completion(response: &Value) -> Result<Completion, ProviderError> {
    let message = response
        .get("message")
        .ok_or_else(|| ProviderError::InvalidResponse("no message in response".to_string()))?;

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .map(str::to_string);

    let tool_calls = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|calls| calls.iter().map(parse_tool_call).collect())
        .unwrap_or_default();

    let input_tokens = response
        .get("prompt_eval_count")
        .and_then(Value::as_i64)
        .map(|v| v as i32);
    let output_tokens = response
        .get("eval_count")
        .and_then(Value::as_i64)
        .map(|v| v as i32);
    let total_tokens = match (input_tokens, output_tokens) {
        (Some(input), Some(output)) => Some(input + output),
        _ => None,
    };

    Ok(Completion {
        text,
        tool_calls,
        usage: Usage::new(input_tokens, output_tokens, total_tokens),
    })
}

fn parse_tool_call(tool_call: &Value) -> ToolCall {
    let id = tool_call.get("id").and_then(Value::as_str);
    let name = tool_call
        .pointer("/function/name")
        .and_then(Value::as_str)
        .unwrap_or("unknown_tool");
    let arguments = tool_call
        .pointer("/function/arguments")
        .unwrap_or(&Value::Null);
    ToolCall::normalized(id, name, arguments)
}

/// Missing usage is not an error; some compatible servers omit it
pub fn get_usage(data: &Value) -> Usage {
    let Some(usage) = data.get("usage") else {
        return Usage::default();
    };

    let input_tokens = usage
        .get("prompt_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let output_tokens = usage
        .get("completion_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32);

    let total_tokens = usage
        .get("total_tokens")
        .and_then(|v| v.as_i64())
        .map(|v| v as i32)
        .or_else(|| match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        });

    Usage::new(input_tokens, output_tokens, total_tokens)
}

pub fn sanitize_function_name(name: &str) -> String {
    let re = Regex::new(r"[^a-zA-Z0-9_-]").unwrap();
    re.replace_all(name, "_").to_string()
}
