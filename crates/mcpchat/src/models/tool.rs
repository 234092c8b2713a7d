use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A tool that can be used by a model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tool {
    /// The name of the tool
    pub name: String,
    /// A description of what the tool does
    pub description: String,
    /// JSON schema of the parameters that the tool accepts
    pub parameters: Value,
}

impl Tool {
    /// Create a new tool with the given name and description
    pub fn new<N, D>(name: N, description: D, parameters: Value) -> Self
    where
        N: Into<String>,
        D: Into<String>,
    {
        Tool {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool invocation requested by the model.
///
/// `arguments` always holds the canonical serialized JSON text, which is what
/// gets stored in history and sent back to the provider on the next request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

impl ToolCall {
    pub fn new<I, N, A>(id: I, name: N, arguments: A) -> Self
    where
        I: Into<String>,
        N: Into<String>,
        A: Into<String>,
    {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    /// Build a call from whatever a provider reported, filling in an id when the
    /// provider did not send one and canonicalizing the argument payload.
    pub fn normalized(id: Option<&str>, name: &str, raw_arguments: &Value) -> Self {
        let id = match id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => synthesize_call_id(name),
        };
        Self {
            id,
            name: name.to_string(),
            arguments: canonical_arguments(raw_arguments),
        }
    }

    /// Decode the arguments for display. Text that is not JSON is shown as a string.
    pub fn decoded_arguments(&self) -> Value {
        serde_json::from_str(&self.arguments)
            .unwrap_or_else(|_| Value::String(self.arguments.clone()))
    }
}

/// Ids only need to be unique within a turn; the random suffix makes repeated
/// calls to the same tool distinguishable.
pub fn synthesize_call_id(name: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("call_{}_{}", name, &suffix[..8])
}

fn canonical_arguments(raw: &Value) -> String {
    match raw {
        Value::String(encoded) => encoded.clone(),
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}
