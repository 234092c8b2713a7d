use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod prompt;
mod session;
mod tools;

use commands::session::build_session;
use commands::version::print_version;
use session::session_file::ensure_config_dir;

#[derive(Parser)]
#[command(author, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    chat: ChatArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Clone, Debug)]
pub struct ChatArgs {
    /// Completion provider
    #[arg(short, long, value_enum, default_value = "openai", global = true)]
    pub provider: CliProviderVariant,

    /// Model to use (defaults depend on the provider)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// OpenAI API key (can also be set via OPENAI_API_KEY environment variable)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Provider base URL (can also be set via OPENAI_HOST or OLLAMA_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Replace the default system prompt
    #[arg(long, global = true)]
    pub system_prompt: Option<String>,

    /// Stop a turn after this many consecutive tool-call rounds
    #[arg(long, global = true)]
    pub max_tool_rounds: Option<usize>,

    /// Do not offer the builtin tools to the model
    #[arg(long, global = true)]
    pub no_tools: bool,

    /// Name of the session transcript to create or resume
    #[arg(short, long, global = true)]
    pub session: Option<String>,

    /// Write debug level logs
    #[arg(long, global = true)]
    pub verbose_log: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CliProviderVariant {
    #[value(name = "openai")]
    OpenAi,
    Ollama,
}

#[derive(Subcommand)]
enum Command {
    /// Start or resume an interactive chat session
    Session,

    /// Print the version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Version) => {
            print_version();
            Ok(())
        }
        Some(Command::Session) | None => {
            init_tracing(cli.chat.verbose_log);
            let mut session = build_session(&cli.chat)?;
            session.start().await
        }
    }
}

/// Logs go to a file so they never interleave with the chat display.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "mcpchat=debug" } else { "mcpchat=info" };
    let env_filter = EnvFilter::try_from_env("MCPCHAT_LOG")
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    match open_log_file() {
        Ok((path, file)) => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .with(env_filter)
                .init();
            tracing::info!(path = %path.display(), "logging initialized");
        }
        // Without a log file, stay silent rather than corrupt the terminal
        Err(_) => tracing_subscriber::registry().with(env_filter).init(),
    }
}

fn open_log_file() -> Result<(PathBuf, fs::File)> {
    let path = ensure_config_dir("logs")?.join("mcpchat.log");
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    Ok((path, file))
}
