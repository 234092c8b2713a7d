use std::path::PathBuf;

use anyhow::Result;
use console::style;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::hint::HistoryHinter;
use rustyline::history::FileHistory;
use rustyline::{Completer, Config, Context, Editor, Helper, Highlighter, Hinter, Validator};
use tracing::warn;

use super::{Input, InputType, Prompt};

const PROMPT: &str = "\x1b[1m\x1b[38;5;30m> \x1b[0m";

const COMMANDS: [&str; 10] = [
    "/verbose",
    "/v",
    "/t",
    "/cancel",
    "/interrupt",
    "/stop",
    "/help",
    "/?",
    "/exit",
    "/quit",
];

/// Slash commands starting with `prefix`
fn command_candidates(prefix: &str) -> Vec<&'static str> {
    if !prefix.starts_with('/') || prefix.contains(char::is_whitespace) {
        return Vec::new();
    }
    COMMANDS
        .iter()
        .copied()
        .filter(|command| command.starts_with(prefix))
        .collect()
}

/// Tab completion for slash commands typed at the start of the line
pub struct CommandCompleter;

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let candidates = command_candidates(&line[..pos])
            .into_iter()
            .map(|command| Pair {
                display: command.to_string(),
                replacement: command.to_string(),
            })
            .collect();
        Ok((0, candidates))
    }
}

/// Command completion plus inline suggestions from earlier input
#[derive(Helper, Completer, Hinter, Highlighter, Validator)]
pub struct ChatHelper {
    #[rustyline(Completer)]
    completer: CommandCompleter,
    #[rustyline(Hinter)]
    hinter: HistoryHinter,
}

impl ChatHelper {
    pub fn new() -> Self {
        Self {
            completer: CommandCompleter,
            hinter: HistoryHinter::new(),
        }
    }
}

impl Default for ChatHelper {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RustylinePrompt {
    editor: Editor<ChatHelper, FileHistory>,
    history_file: PathBuf,
}

impl RustylinePrompt {
    pub fn new(history_file: PathBuf) -> Result<Self> {
        let config = Config::builder()
            .history_ignore_space(true)
            .auto_add_history(false)
            .build();

        let mut editor: Editor<ChatHelper, FileHistory> = Editor::with_config(config)?;
        editor.set_helper(Some(ChatHelper::new()));
        if history_file.exists() {
            editor.load_history(&history_file)?;
        }

        Ok(Self {
            editor,
            history_file,
        })
    }
}

/// Classify one line of operator input
pub fn parse_input(line: &str) -> Input {
    let text = line.trim();
    let command = text.to_ascii_lowercase();
    let input_type = match command.as_str() {
        "" => InputType::AskAgain,
        "exit" | "quit" | "/exit" | "/quit" => InputType::Exit,
        "/verbose" | "/v" => InputType::ToggleVerbose,
        "/t" => InputType::ToggleTheme,
        "/help" | "/?" => InputType::Help,
        "/cancel" | "/interrupt" | "/stop" => InputType::CancelHelp,
        _ => {
            return Input {
                input_type: InputType::Message,
                content: Some(text.to_string()),
            }
        }
    };
    Input::of(input_type)
}

fn print_help() {
    println!("\n{}", style("Commands:").bold());
    println!("  /exit | /quit      - Exit the session (or type exit)");
    println!("  /verbose | /v      - Toggle full tool call panels");
    println!("  /t                 - Toggle Light/Dark theme");
    println!("  /cancel            - How to interrupt running tools");
    println!("  /? | /help         - Display this help message");
    println!("  Ctrl+C             - Interrupt tool execution after the current tool\n");
}

impl Prompt for RustylinePrompt {
    fn get_input(&mut self) -> Result<Input> {
        let line = match self.editor.readline(PROMPT) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) => {
                println!("Use 'exit' to quit");
                return Ok(Input::of(InputType::AskAgain));
            }
            Err(ReadlineError::Eof) => return Ok(Input::of(InputType::Exit)),
            Err(e) => return Err(e.into()),
        };

        let input = parse_input(&line);
        if input.input_type == InputType::Message {
            self.editor.add_history_entry(line.trim())?;
        }

        match input.input_type {
            InputType::Help => {
                print_help();
                Ok(Input::of(InputType::AskAgain))
            }
            InputType::CancelHelp => {
                println!(
                    "{}",
                    style("Press Ctrl+C while tools are running; the remaining tool calls of the turn are skipped.")
                        .dim()
                );
                Ok(Input::of(InputType::AskAgain))
            }
            _ => Ok(input),
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.editor.save_history(&self.history_file) {
            warn!(error = %e, path = %self.history_file.display(), "failed to save line history");
        }
    }
}
