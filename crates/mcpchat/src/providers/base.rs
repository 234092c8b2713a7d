use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolCall};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// One buffered model response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub usage: Usage,
}

impl Completion {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::default()
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A finite, non-restartable sequence of text deltas.
///
/// The stream ending (`None`) means the response finished cleanly. A failure is
/// reported as a single `Err` item, after which nothing else is yielded.
pub type FragmentStream<'a> = BoxStream<'a, Result<String, ProviderError>>;

/// Base trait for completion backends (OpenAI, Ollama, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &str;

    fn supports_streaming(&self) -> bool {
        false
    }

    /// Generate the next response, which may request tool calls.
    /// A response without text or tool calls is not an error.
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<Completion, ProviderError>;

    /// Stream the next response as text fragments
    async fn stream(
        &self,
        _system: &str,
        _messages: &[Message],
    ) -> Result<FragmentStream<'_>, ProviderError> {
        Err(ProviderError::StreamingUnsupported(self.name().to_string()))
    }
}
