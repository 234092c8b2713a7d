use serde::{Deserialize, Serialize};

use super::tool::ToolCall;
use crate::errors::ToolResult;

/// The answer to one tool call, referencing the call by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: String,
    pub name: String,
    /// Serialized tool output, or the error the invocation produced
    pub result: ToolResult<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
/// A message to or from an LLM
pub enum Message {
    User {
        text: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    ToolResult(ToolResponse),
}

impl Message {
    pub fn user<S: Into<String>>(text: S) -> Self {
        Message::User { text: text.into() }
    }

    /// A final assistant message without tool calls
    pub fn assistant<S: Into<String>>(text: S) -> Self {
        Message::Assistant {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    /// The assistant placeholder recorded before its tool calls are dispatched
    pub fn assistant_with_tool_calls(text: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant { text, tool_calls }
    }

    pub fn tool_result<I, N>(id: I, name: N, result: ToolResult<String>) -> Self
    where
        I: Into<String>,
        N: Into<String>,
    {
        Message::ToolResult(ToolResponse {
            id: id.into(),
            name: name.into(),
            result,
        })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Message::User { text } => Some(text),
            Message::Assistant { text, .. } => text.as_deref(),
            Message::ToolResult(_) => None,
        }
    }

    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    pub fn as_tool_response(&self) -> Option<&ToolResponse> {
        if let Message::ToolResult(ref response) = self {
            Some(response)
        } else {
            None
        }
    }
}
