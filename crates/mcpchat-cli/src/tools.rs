use async_trait::async_trait;
use serde_json::{json, Value};

use mcpchat::errors::{ToolError, ToolResult};
use mcpchat::models::tool::Tool;
use mcpchat::tool::{ToolArguments, ToolInvoker};

/// A few local tools so a session can exercise tool calling without any
/// external server.
pub struct BuiltinTools;

impl BuiltinTools {
    fn count_words(args: &Value) -> ToolResult<Value> {
        let text = args
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("'text' must be a string".into()))?;
        Ok(json!({ "count": text.split_whitespace().count() }))
    }

    fn current_time() -> ToolResult<Value> {
        let now = chrono::Local::now();
        Ok(json!({
            "local": now.to_rfc3339(),
            "utc": now.with_timezone(&chrono::Utc).to_rfc3339(),
        }))
    }

    fn calc(args: &Value) -> ToolResult<Value> {
        let operand = |key: &str| {
            args.get(key).and_then(Value::as_f64).ok_or_else(|| {
                ToolError::InvalidParameters(format!("'{}' must be a number", key))
            })
        };
        let (a, b) = (operand("a")?, operand("b")?);
        let result = match args.get("op").and_then(Value::as_str).unwrap_or("add") {
            "add" => a + b,
            "sub" => a - b,
            "mul" => a * b,
            "div" if b == 0.0 => {
                return Err(ToolError::ExecutionError("division by zero".into()));
            }
            "div" => a / b,
            other => {
                return Err(ToolError::InvalidParameters(format!(
                    "unknown operation '{}'",
                    other
                )))
            }
        };

        // Whole results read better as integers
        if result.fract() == 0.0 && result.abs() < i64::MAX as f64 {
            Ok(json!(result as i64))
        } else {
            Ok(json!(result))
        }
    }
}

#[async_trait]
impl ToolInvoker for BuiltinTools {
    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                "count_words",
                "Count the number of words in text",
                json!({
                    "type": "object",
                    "properties": {
                        "text": {
                            "type": "string",
                            "description": "The text to count words in"
                        }
                    },
                    "required": ["text"]
                }),
            ),
            Tool::new(
                "current_time",
                "Get the current local and UTC time",
                json!({"type": "object", "properties": {}}),
            ),
            Tool::new(
                "calc",
                "Apply an arithmetic operation to two numbers",
                json!({
                    "type": "object",
                    "properties": {
                        "a": {"type": "number"},
                        "b": {"type": "number"},
                        "op": {
                            "type": "string",
                            "enum": ["add", "sub", "mul", "div"],
                            "description": "Defaults to add"
                        }
                    },
                    "required": ["a", "b"]
                }),
            ),
        ]
    }

    async fn call(&self, name: &str, arguments: ToolArguments) -> ToolResult<Value> {
        let args = arguments.into_value()?;
        match name {
            "count_words" => Self::count_words(&args),
            "current_time" => Self::current_time(),
            "calc" => Self::calc(&args),
            _ => Err(ToolError::ToolNotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn call(name: &str, args: Value) -> ToolResult<Value> {
        BuiltinTools
            .call(name, ToolArguments::Structured(args))
            .await
    }

    #[tokio::test]
    async fn test_count_words() {
        let result = call("count_words", json!({"text": "the quick  brown fox"})).await;
        assert_eq!(result, Ok(json!({"count": 4})));
    }

    #[tokio::test]
    async fn test_calc() {
        assert_eq!(call("calc", json!({"a": 2, "b": 2})).await, Ok(json!(4)));
        assert_eq!(
            call("calc", json!({"a": 1, "b": 4, "op": "div"})).await,
            Ok(json!(0.25))
        );
        assert!(matches!(
            call("calc", json!({"a": 1, "b": 0, "op": "div"})).await,
            Err(ToolError::ExecutionError(_))
        ));
        assert!(matches!(
            call("calc", json!({"a": "two", "b": 2})).await,
            Err(ToolError::InvalidParameters(_))
        ));
    }

    #[tokio::test]
    async fn test_current_time_has_both_zones() {
        let result = call("current_time", json!({})).await.unwrap();
        assert!(result["utc"].as_str().is_some());
        assert!(result["local"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        assert_eq!(
            call("launch_rockets", json!({})).await,
            Err(ToolError::ToolNotFound("launch_rockets".to_string()))
        );
    }

    #[test]
    fn test_declared_tools() {
        let names: Vec<String> = BuiltinTools.tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["count_words", "current_time", "calc"]);
    }
}
