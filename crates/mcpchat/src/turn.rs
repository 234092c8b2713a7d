use std::time::{Duration, Instant};

use crate::display::CancelFlag;
use crate::models::tool::ToolCall;

/// Where the orchestrator is within one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum TurnPhase {
    Requesting,
    ToolsPending,
    Streaming,
    Direct,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStatus {
    Running,
    Succeeded(Duration),
    Failed(Duration),
}

/// Timing record of one tool call within the current turn
#[derive(Debug, Clone, PartialEq)]
pub struct ToolProgress {
    /// Position in the turn, counting across rounds
    pub index: usize,
    pub name: String,
    pub started: Instant,
    pub status: ToolStatus,
}

impl ToolProgress {
    pub fn elapsed(&self) -> Duration {
        match self.status {
            ToolStatus::Running => self.started.elapsed(),
            ToolStatus::Succeeded(elapsed) | ToolStatus::Failed(elapsed) => elapsed,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ToolStatus::Running
    }
}

/// Transient state of one orchestrator invocation, dropped when the turn ends.
#[derive(Debug)]
pub struct TurnState {
    pub cancel: CancelFlag,
    started: Instant,
    tools_started: Option<Instant>,
    tools: Vec<ToolProgress>,
    rounds: usize,
}

impl TurnState {
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            started: Instant::now(),
            tools_started: None,
            tools: Vec::new(),
            rounds: 0,
        }
    }

    /// Restart the response clock just before a completion request
    pub fn start_clock(&mut self) {
        self.started = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn next_round(&mut self) -> usize {
        self.rounds += 1;
        self.rounds
    }

    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn begin_tool(&mut self, call: &ToolCall) -> &ToolProgress {
        let now = Instant::now();
        self.tools_started.get_or_insert(now);
        let index = self.tools.len();
        self.tools.push(ToolProgress {
            index,
            name: call.name.clone(),
            started: now,
            status: ToolStatus::Running,
        });
        &self.tools[index]
    }

    /// Mark the most recent tool as done. Returns `None` if no tool is running.
    pub fn finish_tool(&mut self, succeeded: bool) -> Option<&ToolProgress> {
        let progress = self.tools.last_mut().filter(|p| p.is_running())?;
        let elapsed = progress.started.elapsed();
        progress.status = if succeeded {
            ToolStatus::Succeeded(elapsed)
        } else {
            ToolStatus::Failed(elapsed)
        };
        Some(&*progress)
    }

    pub fn tools(&self) -> &[ToolProgress] {
        &self.tools
    }

    /// Time since the first tool of the turn started
    pub fn tools_elapsed(&self) -> Option<Duration> {
        self.tools_started.map(|started| started.elapsed())
    }

    pub fn reset_timing(&mut self) {
        self.tools.clear();
        self.tools_started = None;
    }
}

/// Fragments of one streaming response, in arrival order
#[derive(Debug, Default)]
pub struct StreamBuffer {
    fragments: Vec<String>,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: String) {
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn into_text(self) -> String {
        self.fragments.concat()
    }
}
