use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::prompt::rustyline::RustylinePrompt;
use crate::session::session_file::{ensure_config_dir, history_file};
use crate::session::Session;
use crate::tools::BuiltinTools;
use crate::{ChatArgs, CliProviderVariant};

use mcpchat::orchestrator::{Orchestrator, TurnOptions};
use mcpchat::providers::configs::{
    EnvConfig, OllamaProviderConfig, OpenAiProviderConfig, ProviderConfig, OPENAI_HOST,
    OPENAI_MODEL,
};
use mcpchat::providers::factory;
use mcpchat::tool::{NoTools, ToolInvoker};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant running in a terminal. \
Use the available tools when they help answer the question, and answer in Markdown.";

pub fn build_session(args: &ChatArgs) -> Result<Session> {
    let provider = factory::get_provider(create_provider_config(args)?)?;
    let tools: Box<dyn ToolInvoker> = if args.no_tools {
        Box::new(NoTools)
    } else {
        Box::new(BuiltinTools)
    };
    let system_prompt = args
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let orchestrator = Orchestrator::new(provider, tools, system_prompt).with_options(TurnOptions {
        max_tool_rounds: args.max_tool_rounds,
    });
    let prompt = RustylinePrompt::new(history_file()?)?;

    Session::new(orchestrator, Box::new(prompt), session_path(args.session.as_deref())?)
}

fn session_path(name: Option<&str>) -> Result<PathBuf> {
    let name = match name {
        Some(name) => name.to_string(),
        None => chrono::Local::now().format("%Y%m%d-%H%M%S").to_string(),
    };
    Ok(ensure_config_dir("sessions")?.join(format!("{}.jsonl", name)))
}

fn create_provider_config(args: &ChatArgs) -> Result<ProviderConfig> {
    match args.provider {
        CliProviderVariant::OpenAi => {
            let mut config = match &args.api_key {
                Some(api_key) => OpenAiProviderConfig {
                    host: OpenAiProviderConfig::get_env(
                        "OPENAI_HOST",
                        false,
                        Some(OPENAI_HOST.to_string()),
                    )?
                    .unwrap_or_else(|| OPENAI_HOST.to_string()),
                    api_key: api_key.clone(),
                    model: OPENAI_MODEL.to_string(),
                    temperature: None,
                    max_tokens: None,
                },
                None => OpenAiProviderConfig::from_env()
                    .context("Pass --api-key or set the OPENAI_API_KEY environment variable")?,
            };
            if let Some(host) = &args.host {
                config.host = host.clone();
            }
            if let Some(model) = &args.model {
                config.model = model.clone();
            }
            Ok(ProviderConfig::OpenAi(config))
        }
        CliProviderVariant::Ollama => {
            let mut config = OllamaProviderConfig::from_env()?;
            if let Some(host) = &args.host {
                config.host = host.clone();
            }
            if let Some(model) = &args.model {
                config.model = model.clone();
            }
            Ok(ProviderConfig::Ollama(config))
        }
    }
}
