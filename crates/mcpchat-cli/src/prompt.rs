use anyhow::Result;

pub mod display;
pub mod progress;
pub mod rustyline;
pub mod thinking;

pub trait Prompt {
    fn get_input(&mut self) -> Result<Input>;
    fn close(&mut self);
    fn ready(&self) {
        println!("\n");
        println!("mcpchat is running! Enter your question, or /help for commands.");
        println!("\n");
    }
}

pub struct Input {
    pub input_type: InputType,
    pub content: Option<String>, // Optional content as sometimes the user may be issuing a command eg. (Exit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    AskAgain,      // Ask the user for input again. Control flow command.
    Message,       // User sent a message
    Exit,          // User wants to exit the session
    ToggleVerbose, // Switch between compact and full tool call rendering
    ToggleTheme,
    Help,
    CancelHelp, // Explain how to interrupt running tools
}

impl Input {
    pub fn of(input_type: InputType) -> Self {
        Self {
            input_type,
            content: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    /// Name of the matching bat syntax theme
    pub fn bat_theme(&self) -> &'static str {
        match self {
            Theme::Light => "GitHub",
            Theme::Dark => "zenburn",
        }
    }

    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}
