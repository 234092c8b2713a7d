use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::message::Message;

/// The ordered record of a conversation.
///
/// One value per chat session. During a turn only the orchestrator and the
/// dispatcher write to it; providers borrow [`messages`](Self::messages).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Drop tool calls of the most recent tool-calling assistant message that
    /// never received a result, removing the message entirely when none did.
    ///
    /// Called when a dispatch round is cancelled so every remaining call id is
    /// answered by exactly one tool-result message.
    pub fn retain_answered_tool_calls(&mut self) {
        let Some(position) = self
            .messages
            .iter()
            .rposition(|message| !message.tool_calls().is_empty())
        else {
            return;
        };

        let answered: HashSet<String> = self.messages[position + 1..]
            .iter()
            .filter_map(|message| message.as_tool_response())
            .map(|response| response.id.clone())
            .collect();

        let mut remove = false;
        if let Message::Assistant { text, tool_calls } = &mut self.messages[position] {
            tool_calls.retain(|call| answered.contains(&call.id));
            remove = tool_calls.is_empty() && text.as_deref().map_or(true, str::is_empty);
        }
        if remove {
            self.messages.remove(position);
        }
    }
}

impl From<Vec<Message>> for ConversationHistory {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::ToolCall;

    fn calls(ids: &[&str]) -> Vec<ToolCall> {
        ids.iter().map(|id| ToolCall::new(*id, "echo", "{}")).collect()
    }

    #[test]
    fn test_retain_answered_tool_calls_trims_unanswered() {
        let mut history = ConversationHistory::from(vec![
            Message::user("go"),
            Message::assistant_with_tool_calls(None, calls(&["a", "b", "c"])),
            Message::tool_result("a", "echo", Ok("1".into())),
        ]);

        history.retain_answered_tool_calls();

        assert_eq!(history.len(), 3);
        let ids: Vec<_> = history.messages()[1]
            .tool_calls()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[test]
    fn test_retain_answered_tool_calls_removes_empty_placeholder() {
        let mut history = ConversationHistory::from(vec![
            Message::user("go"),
            Message::assistant_with_tool_calls(None, calls(&["a", "b"])),
        ]);

        history.retain_answered_tool_calls();

        assert_eq!(history.messages(), &[Message::user("go")]);
    }

    #[test]
    fn test_retain_answered_tool_calls_keeps_text() {
        let mut history = ConversationHistory::from(vec![
            Message::user("go"),
            Message::assistant_with_tool_calls(Some("Let me check.".into()), calls(&["a"])),
        ]);

        history.retain_answered_tool_calls();

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[1].text(), Some("Let me check."));
        assert!(history.messages()[1].tool_calls().is_empty());
    }
}
