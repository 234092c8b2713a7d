use std::io::{self, Write};
use std::time::Duration;

use bat::WrappingMode;
use cliclack::spinner;
use console::style;
use serde_json::Value;
use tracing::warn;

use mcpchat::display::TurnDisplay;
use mcpchat::turn::{ToolProgress, ToolStatus};

use super::progress::{ProgressBoard, ProgressTicker};
use super::thinking::get_random_thinking_message;
use super::Theme;

/// The single visual mode that is live at any moment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Idle,
    Busy,
    Panel,
    Streaming,
    Progress,
}

/// Terminal rendering of a turn: bat panels, a cliclack spinner while the
/// model is thinking, raw streamed text and an animated tool progress line.
pub struct ConsoleDisplay {
    mode: DisplayMode,
    theme: Theme,
    verbose: bool,
    spinner: Option<cliclack::ProgressBar>,
    ticker: Option<ProgressTicker>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        ConsoleDisplay {
            mode: DisplayMode::Idle,
            theme: Theme::Dark,
            verbose: false,
            spinner: None,
            ticker: None,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn toggle_verbose(&mut self) -> bool {
        self.verbose = !self.verbose;
        self.verbose
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    /// Print a line of session chrome outside any turn
    pub fn notice(&mut self, text: &str) {
        self.teardown();
        println!("{}", style(text).dim());
    }

    fn teardown(&mut self) {
        match std::mem::replace(&mut self.mode, DisplayMode::Idle) {
            DisplayMode::Idle | DisplayMode::Panel => {}
            DisplayMode::Busy => {
                if let Some(spinner) = self.spinner.take() {
                    spinner.stop("");
                }
            }
            DisplayMode::Streaming => println!(),
            DisplayMode::Progress => {
                if let Some(ticker) = self.ticker.take() {
                    let total = ticker.stop();
                    println!(
                        "{}",
                        style(format!(
                            "Tools completed in {:.2}s total",
                            total.as_secs_f64()
                        ))
                        .dim()
                    );
                }
            }
        }
    }

    fn panel(&mut self, title: &str, content: &str, language: &str) {
        self.teardown();
        let printed = bat::PrettyPrinter::new()
            .input(bat::Input::from_bytes(content.as_bytes()).name(title))
            .theme(self.theme.bat_theme())
            .language(language)
            .grid(true)
            .header(true)
            .wrapping_mode(WrappingMode::Character)
            .print();
        if let Err(e) = printed {
            warn!(error = %e, "failed to render panel");
            println!("{}\n{}", style(title).bold(), content);
        }
        self.mode = DisplayMode::Panel;
    }

    fn footer(elapsed: Duration) {
        println!(
            "{}",
            style(format!("Response time: {:.2}s", elapsed.as_secs_f64())).dim()
        );
    }
}

impl Default for ConsoleDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnDisplay for ConsoleDisplay {
    fn show_user_message(&mut self, text: &str) {
        let text = if text.is_empty() { "[No Message]" } else { text };
        self.panel("You", text, "Markdown");
    }

    fn show_busy(&mut self) {
        if self.mode == DisplayMode::Busy {
            return;
        }
        self.teardown();
        let busy = spinner();
        busy.start(format!("{}...", get_random_thinking_message()));
        self.spinner = Some(busy);
        self.mode = DisplayMode::Busy;
    }

    fn tool_started(&mut self, progress: &ToolProgress, arguments: &Value) {
        if self.verbose {
            let arguments = serde_json::to_string_pretty(arguments)
                .unwrap_or_else(|_| arguments.to_string());
            self.panel(&format!("Tool Call: {}", progress.name), &arguments, "JSON");
            return;
        }

        if self.mode != DisplayMode::Progress {
            self.teardown();
            self.ticker = Some(ProgressTicker::start(ProgressBoard::new(progress.started)));
            self.mode = DisplayMode::Progress;
        }
        if let Some(ticker) = &self.ticker {
            ticker.update(|board| board.start_tool(&progress.name, progress.started));
        }
    }

    fn tool_finished(&mut self, progress: &ToolProgress) {
        if let Some(ticker) = &self.ticker {
            let succeeded = !matches!(progress.status, ToolStatus::Failed(_));
            ticker.update(|board| board.finish_tool(progress.elapsed(), succeeded));
        }
    }

    fn tools_interrupted(&mut self) {
        self.teardown();
        println!("{}", style("Tool execution interrupted by user!").red().bold());
    }

    fn stream_fragment(&mut self, fragment: &str) {
        if self.mode != DisplayMode::Streaming {
            self.teardown();
            println!("{}", style("Assistant:").magenta().bold());
            self.mode = DisplayMode::Streaming;
        }
        print!("{}", fragment);
        let _ = io::stdout().flush();
    }

    fn finish_stream(&mut self, elapsed: Duration) {
        self.teardown();
        Self::footer(elapsed);
    }

    fn assistant_response(&mut self, text: &str, elapsed: Duration) {
        let text = if text.is_empty() { "[No Response]" } else { text };
        self.panel("Assistant", text, "Markdown");
        Self::footer(elapsed);
    }

    fn error(&mut self, message: &str) {
        self.teardown();
        eprintln!("{} {}", style("Error:").red().bold(), message);
    }

    fn stop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpchat::display::CancelFlag;
    use mcpchat::models::tool::ToolCall;
    use mcpchat::turn::TurnState;
    use serde_json::json;

    #[test]
    fn test_stop_is_idempotent() {
        let mut display = ConsoleDisplay::new();
        display.stop();
        display.stop();
        assert_eq!(display.mode(), DisplayMode::Idle);
    }

    #[tokio::test]
    async fn test_progress_mode_lifecycle() {
        let mut display = ConsoleDisplay::new();
        let mut state = TurnState::new(CancelFlag::new());

        display.tool_started(state.begin_tool(&ToolCall::new("c1", "calc", "{}")), &json!({}));
        assert_eq!(display.mode(), DisplayMode::Progress);

        if let Some(progress) = state.finish_tool(true) {
            display.tool_finished(progress);
        }
        display.tool_started(state.begin_tool(&ToolCall::new("c2", "calc", "{}")), &json!({}));
        assert_eq!(display.mode(), DisplayMode::Progress);

        display.stop();
        assert_eq!(display.mode(), DisplayMode::Idle);
        display.stop();
        assert_eq!(display.mode(), DisplayMode::Idle);
    }

    #[test]
    fn test_streaming_switches_mode_once() {
        let mut display = ConsoleDisplay::new();
        display.stream_fragment("Hel");
        display.stream_fragment("lo");
        assert_eq!(display.mode(), DisplayMode::Streaming);

        display.finish_stream(Duration::from_millis(1200));
        assert_eq!(display.mode(), DisplayMode::Idle);
    }

    #[test]
    fn test_toggles() {
        let mut display = ConsoleDisplay::new();
        assert!(display.toggle_verbose());
        assert!(!display.toggle_verbose());
        assert_eq!(display.toggle_theme(), Theme::Light);
    }
}
