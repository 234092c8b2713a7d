use anyhow::Result;
use console::style;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::prompt::display::ConsoleDisplay;
use crate::prompt::{InputType, Prompt};
use mcpchat::display::{CancelFlag, TurnDisplay};
use mcpchat::history::ConversationHistory;
use mcpchat::models::message::Message;
use mcpchat::orchestrator::Orchestrator;

pub mod session_file;

use session_file::{load_messages, persist_messages};

pub struct Session {
    orchestrator: Orchestrator,
    prompt: Box<dyn Prompt>,
    display: ConsoleDisplay,
    history: ConversationHistory,
    session_file: PathBuf,
    cancel: CancelFlag,
}

impl Session {
    /// Open a session, resuming the transcript at `session_file` if it exists
    pub fn new(
        orchestrator: Orchestrator,
        prompt: Box<dyn Prompt>,
        session_file: PathBuf,
    ) -> Result<Self> {
        let history = ConversationHistory::from(load_messages(&session_file)?);
        Ok(Session {
            orchestrator,
            prompt,
            display: ConsoleDisplay::new(),
            history,
            session_file,
            cancel: CancelFlag::new(),
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        self.setup_session();

        loop {
            let input = match self.prompt.get_input() {
                Ok(input) => input,
                Err(e) => {
                    self.close_session();
                    return Err(e.context("failed to read input"));
                }
            };
            match input.input_type {
                InputType::Message => {
                    if let Some(content) = input.content {
                        self.process_message(content).await;
                    }
                }
                InputType::Exit => break,
                InputType::AskAgain | InputType::Help | InputType::CancelHelp => continue,
                InputType::ToggleVerbose => {
                    let verbose = self.display.toggle_verbose();
                    self.display.notice(if verbose {
                        "Verbose mode: tool calls are shown in full"
                    } else {
                        "Compact mode: tool calls are shown on one animated line"
                    });
                }
                InputType::ToggleTheme => {
                    let theme = self.display.toggle_theme();
                    self.display
                        .notice(&format!("Switching to {:?} theme", theme));
                }
            }
        }

        self.close_session();
        Ok(())
    }

    async fn process_message(&mut self, content: String) {
        self.history.push(Message::user(content.clone()));
        self.display.show_user_message(&content);
        self.persist();

        self.cancel.reset();
        let watcher = spawn_interrupt_watcher(self.cancel.clone());
        let result = self
            .orchestrator
            .process_turn(&mut self.history, &mut self.display, &self.cancel)
            .await;
        watcher.abort();

        match result {
            Ok(outcome) => debug!(
                rounds = outcome.tool_rounds,
                elapsed_ms = outcome.elapsed.as_millis() as u64,
                "turn completed"
            ),
            Err(e) if e.is_cancelled() => {
                println!(
                    "{}",
                    style("Turn interrupted. Results of completed tools were kept.").yellow()
                );
            }
            // Already shown and recorded by the orchestrator
            Err(_) => {}
        }
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = persist_messages(&self.session_file, self.history.messages()) {
            warn!(error = %e, "failed to persist messages");
            eprintln!("Failed to persist messages: {}", e);
        }
    }

    fn setup_session(&mut self) {
        let resumed = !self.history.is_empty();
        self.display.notice(&format!(
            "{} session. Recording to {}",
            if resumed { "Resuming" } else { "Starting" },
            self.session_file.display()
        ));
        if resumed {
            self.display.notice(&format!(
                "Loaded {} earlier messages.",
                self.history.len()
            ));
        }
        let tools = self.orchestrator.tools().tools();
        info!(
            provider = self.orchestrator.provider().name(),
            tools = tools.len(),
            "session started"
        );
        if !tools.is_empty() {
            let names: Vec<String> = tools.into_iter().map(|tool| tool.name).collect();
            self.display
                .notice(&format!("Tools available: {}", names.join(", ")));
        }

        self.prompt.ready();
    }

    fn close_session(&mut self) {
        self.display.stop();
        self.display.notice(&format!(
            "Closing session. Recorded to {}",
            self.session_file.display()
        ));
        self.prompt.close();
    }
}

/// Turn ctrl-c into a cancellation request for the running turn
fn spawn_interrupt_watcher(cancel: CancelFlag) -> JoinHandle<()> {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt requested");
            cancel.request();
        }
    })
}
