use serde_json::Value;
use tracing::{info, warn};

use crate::display::TurnDisplay;
use crate::history::ConversationHistory;
use crate::models::message::Message;
use crate::models::tool::ToolCall;
use crate::tool::{ToolArguments, ToolInvoker};
use crate::turn::TurnState;

/// How a round of tool calls ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every call produced a tool-result message, successful or not
    Completed,
    /// The operator interrupted after `completed` calls
    Cancelled { completed: usize },
}

/// Executes the tool calls of one assistant message, one after the other.
pub struct ToolDispatcher<'a> {
    invoker: &'a dyn ToolInvoker,
}

impl<'a> ToolDispatcher<'a> {
    pub fn new(invoker: &'a dyn ToolInvoker) -> Self {
        Self { invoker }
    }

    /// Run `calls` in order, appending exactly one tool-result message per
    /// executed call. Tool failures are recorded as results and never abort
    /// the round. The cancel flag is checked before each call.
    pub async fn dispatch(
        &self,
        calls: &[ToolCall],
        history: &mut ConversationHistory,
        display: &mut dyn TurnDisplay,
        state: &mut TurnState,
    ) -> DispatchOutcome {
        let encoding = self.invoker.argument_encoding();

        for (completed, call) in calls.iter().enumerate() {
            if state.cancel.is_requested() {
                info!(
                    completed,
                    skipped = calls.len() - completed,
                    tools_ms = state.tools_elapsed().map(|d| d.as_millis() as u64),
                    "tool execution interrupted"
                );
                state.reset_timing();
                display.tools_interrupted();
                return DispatchOutcome::Cancelled { completed };
            }

            let shown = call.decoded_arguments();
            display.tool_started(state.begin_tool(call), &shown);

            let result = match ToolArguments::for_encoding(encoding, &call.arguments) {
                Ok(arguments) => self.invoker.call(&call.name, arguments).await,
                Err(e) => Err(e),
            }
            .map(render_output);

            if let Some(progress) = state.finish_tool(result.is_ok()) {
                match &result {
                    Ok(_) => info!(
                        tool = %call.name,
                        id = %call.id,
                        elapsed_ms = progress.elapsed().as_millis() as u64,
                        "tool call succeeded"
                    ),
                    Err(e) => warn!(
                        tool = %call.name,
                        id = %call.id,
                        elapsed_ms = progress.elapsed().as_millis() as u64,
                        error = %e,
                        "tool call failed"
                    ),
                }
                display.tool_finished(progress);
            }

            history.push(Message::tool_result(call.id.clone(), call.name.clone(), result));
        }

        if let Some(total) = state.tools_elapsed() {
            info!(
                calls = calls.len(),
                tools_ms = total.as_millis() as u64,
                "tool round finished"
            );
        }
        DispatchOutcome::Completed
    }
}

/// Text stored in history for a successful call
fn render_output(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
