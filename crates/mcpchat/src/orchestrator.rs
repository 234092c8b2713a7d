use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::dispatcher::{DispatchOutcome, ToolDispatcher};
use crate::display::{CancelFlag, TurnDisplay};
use crate::errors::TurnError;
use crate::history::ConversationHistory;
use crate::models::message::Message;
use crate::providers::base::Provider;
use crate::tool::ToolInvoker;
use crate::turn::{StreamBuffer, TurnPhase, TurnState};

#[derive(Debug, Clone, Copy, Default)]
pub struct TurnOptions {
    /// Maximum tool-call rounds per turn. `None` lets the model keep calling
    /// tools for as long as it wants.
    pub max_tool_rounds: Option<usize>,
}

/// A turn that reached a final assistant message
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub text: String,
    pub elapsed: Duration,
    pub tool_rounds: usize,
}

/// Orchestrator drives one operator turn: it asks the provider for a
/// completion, runs any requested tools, and repeats until the model answers
/// without tool calls.
pub struct Orchestrator {
    provider: Box<dyn Provider>,
    tools: Box<dyn ToolInvoker>,
    system_prompt: String,
    options: TurnOptions,
}

impl Orchestrator {
    pub fn new<S: Into<String>>(
        provider: Box<dyn Provider>,
        tools: Box<dyn ToolInvoker>,
        system_prompt: S,
    ) -> Self {
        Self {
            provider,
            tools,
            system_prompt: system_prompt.into(),
            options: TurnOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TurnOptions) -> Self {
        self.options = options;
        self
    }

    pub fn provider(&self) -> &dyn Provider {
        self.provider.as_ref()
    }

    pub fn tools(&self) -> &dyn ToolInvoker {
        self.tools.as_ref()
    }

    /// Run one turn against `history`, which should already end with the
    /// operator's message.
    ///
    /// On success the final assistant message has been appended. On failure an
    /// assistant message describing the error has been appended instead, except
    /// for [`TurnError::Cancelled`], which leaves no trace beyond the tool
    /// results that completed before the interruption.
    pub async fn process_turn(
        &self,
        history: &mut ConversationHistory,
        display: &mut dyn TurnDisplay,
        cancel: &CancelFlag,
    ) -> Result<TurnOutcome, TurnError> {
        let mut state = TurnState::new(cancel.clone());
        let result = self.run(history, display, &mut state).await;

        let result = match result {
            Ok(outcome) => {
                debug!(phase = %TurnPhase::Done, rounds = outcome.tool_rounds, "turn finished");
                Ok(outcome)
            }
            Err(TurnError::Cancelled) => {
                warn!(rounds = state.rounds(), "turn cancelled by operator");
                Err(TurnError::Cancelled)
            }
            Err(e) => {
                error!(phase = %TurnPhase::Failed, error = %e, "turn failed");
                display.error(&e.to_string());
                history.push(Message::assistant(failure_text(&e)));
                Err(e)
            }
        };

        display.stop();
        result
    }

    async fn run(
        &self,
        history: &mut ConversationHistory,
        display: &mut dyn TurnDisplay,
        state: &mut TurnState,
    ) -> Result<TurnOutcome, TurnError> {
        let tools = self.tools.tools();
        let dispatcher = ToolDispatcher::new(self.tools.as_ref());

        let completion = loop {
            debug!(phase = %TurnPhase::Requesting, messages = history.len());
            display.show_busy();
            // Response time covers the final request only, not earlier tool rounds
            state.start_clock();
            let completion = self
                .provider
                .complete(&self.system_prompt, history.messages(), &tools)
                .await?;
            info!(
                input_tokens = ?completion.usage.input_tokens,
                output_tokens = ?completion.usage.output_tokens,
                tool_calls = completion.tool_calls.len(),
                "completion received"
            );

            if !completion.has_tool_calls() {
                break completion;
            }

            let round = state.next_round();
            if let Some(limit) = self.options.max_tool_rounds {
                if round > limit {
                    return Err(TurnError::ToolRoundLimit(limit));
                }
            }

            debug!(phase = %TurnPhase::ToolsPending, round);
            let calls = completion.tool_calls;
            history.push(Message::assistant_with_tool_calls(
                completion.text,
                calls.clone(),
            ));
            match dispatcher.dispatch(&calls, history, display, state).await {
                DispatchOutcome::Completed => {}
                DispatchOutcome::Cancelled { completed } => {
                    debug!(completed, "dropping unanswered tool calls");
                    history.retain_answered_tool_calls();
                    return Err(TurnError::Cancelled);
                }
            }
        };

        let text = if self.provider.supports_streaming() {
            self.stream_response(history, display, state).await?
        } else {
            debug!(phase = %TurnPhase::Direct);
            let text = completion.text.unwrap_or_default();
            display.assistant_response(&text, state.elapsed());
            text
        };

        let elapsed = state.elapsed();
        history.push(Message::assistant(text.clone()));
        Ok(TurnOutcome {
            text,
            elapsed,
            tool_rounds: state.rounds(),
        })
    }

    async fn stream_response(
        &self,
        history: &ConversationHistory,
        display: &mut dyn TurnDisplay,
        state: &TurnState,
    ) -> Result<String, TurnError> {
        debug!(phase = %TurnPhase::Streaming);
        let mut stream = self
            .provider
            .stream(&self.system_prompt, history.messages())
            .await?;
        let mut buffer = StreamBuffer::new();

        while let Some(item) = stream.next().await {
            match item {
                Ok(fragment) => {
                    display.stream_fragment(&fragment);
                    buffer.push(fragment);
                }
                Err(source) => {
                    return Err(TurnError::Stream {
                        partial: buffer.into_text(),
                        source,
                    });
                }
            }
        }

        if buffer.is_empty() {
            warn!("stream ended without any text");
        }
        debug!(fragments = buffer.fragments().len(), "stream finished");
        display.finish_stream(state.elapsed());
        Ok(buffer.into_text())
    }
}

/// History entry recorded for a failed turn
fn failure_text(error: &TurnError) -> String {
    match error {
        TurnError::Stream { partial, .. } if !partial.is_empty() => {
            format!("{}\n\nI encountered an error: {}", partial, error)
        }
        _ => format!("I encountered an error: {}", error),
    }
}
