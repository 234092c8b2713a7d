use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use mcpchat::models::message::Message;

/// `~/.config/mcpchat/<name>`, created on first use
pub fn ensure_config_dir(name: &str) -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let config_dir = home_dir.join(".config").join("mcpchat").join(name);

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// Line editor history, shared by every session
pub fn history_file() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home_dir.join(".mcp_chat_history"))
}

pub fn persist_messages(session_file: &Path, messages: &[Message]) -> Result<()> {
    let file = fs::File::create(session_file)?; // Create or truncate the file
    persist_messages_internal(file, messages)
}

fn persist_messages_internal(session_file: File, messages: &[Message]) -> Result<()> {
    let mut writer = io::BufWriter::new(session_file);

    for message in messages {
        serde_json::to_writer(&mut writer, &message)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read a transcript back. A missing file is an empty transcript.
pub fn load_messages(session_file: &Path) -> Result<Vec<Message>> {
    if !session_file.exists() {
        return Ok(Vec::new());
    }
    let reader = io::BufReader::new(File::open(session_file)?);
    let mut messages = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let message = serde_json::from_str::<Message>(&line).with_context(|| {
            format!("{}:{} is not a message", session_file.display(), number + 1)
        })?;
        messages.push(message);
    }

    Ok(messages)
}
