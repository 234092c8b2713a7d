use async_trait::async_trait;
use serde_json::Value;

use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

/// How an invoker wants to receive tool arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgumentEncoding {
    /// The raw JSON text exactly as the model produced it
    Encoded,
    /// Decoded JSON
    #[default]
    Structured,
}

/// Arguments handed to [`ToolInvoker::call`], in the invoker's declared encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArguments {
    Encoded(String),
    Structured(Value),
}

impl ToolArguments {
    /// Prepare canonical argument text for an invoker.
    pub fn for_encoding(encoding: ArgumentEncoding, canonical: &str) -> ToolResult<Self> {
        match encoding {
            ArgumentEncoding::Encoded => Ok(ToolArguments::Encoded(canonical.to_string())),
            ArgumentEncoding::Structured => serde_json::from_str(canonical)
                .map(ToolArguments::Structured)
                .map_err(|e| {
                    ToolError::InvalidParameters(format!(
                        "Could not interpret tool arguments: {}",
                        e
                    ))
                }),
        }
    }

    /// Structured view regardless of how the arguments were passed
    pub fn into_value(self) -> ToolResult<Value> {
        match self {
            ToolArguments::Structured(value) => Ok(value),
            ToolArguments::Encoded(text) => serde_json::from_str(&text)
                .map_err(|e| ToolError::InvalidParameters(e.to_string())),
        }
    }
}

/// Whatever actually executes tools on behalf of the model
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Schemas declared to the model with every completion request
    fn tools(&self) -> Vec<Tool>;

    fn argument_encoding(&self) -> ArgumentEncoding {
        ArgumentEncoding::Structured
    }

    /// Execute one tool. Failures are returned, never panicked.
    async fn call(&self, name: &str, arguments: ToolArguments) -> ToolResult<Value>;
}

/// An invoker that offers no tools at all
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTools;

#[async_trait]
impl ToolInvoker for NoTools {
    fn tools(&self) -> Vec<Tool> {
        Vec::new()
    }

    async fn call(&self, name: &str, _arguments: ToolArguments) -> ToolResult<Value> {
        Err(ToolError::ToolNotFound(name.to_string()))
    }
}
