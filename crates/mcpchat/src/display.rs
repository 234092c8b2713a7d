use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::turn::ToolProgress;

/// Operator request to stop running tools.
///
/// Cooperative: the dispatcher only samples it between tool calls, so setting
/// it never interrupts a call that is already in flight.
#[derive(Debug, Clone)]
pub struct CancelFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn request(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn reset(&self) {
        self.tx.send_replace(false);
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the orchestrator shows the operator during a turn.
///
/// Implementations keep at most one visual mode alive (busy indicator, tool
/// progress, streaming text or a static panel) and tear the previous one down
/// before switching.
pub trait TurnDisplay: Send {
    fn show_user_message(&mut self, text: &str);

    /// Waiting on the completion provider
    fn show_busy(&mut self);

    fn tool_started(&mut self, progress: &ToolProgress, arguments: &Value);

    fn tool_finished(&mut self, progress: &ToolProgress);

    /// Remaining tool calls were skipped at the operator's request
    fn tools_interrupted(&mut self);

    /// Append one fragment of a streaming answer without redrawing earlier ones
    fn stream_fragment(&mut self, fragment: &str);

    fn finish_stream(&mut self, elapsed: Duration);

    /// A complete, non-streamed answer
    fn assistant_response(&mut self, text: &str, elapsed: Duration);

    fn error(&mut self, message: &str);

    /// Tear down whatever mode is active. Calling it again is a no-op.
    fn stop(&mut self);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let operator = flag.clone();
        assert!(!flag.is_requested());

        operator.request();
        assert!(flag.is_requested());

        flag.reset();
        assert!(!operator.is_requested());
    }
}
