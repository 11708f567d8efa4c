use clap::Parser;
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::AssistantConfig;
use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "dsa-assistant")]
#[command(version)]
#[command(about = "Streaming chat with the DSA Visualizer learning assistant")]
pub struct Args {
    /// Ask a single question and exit. Starts an interactive session when omitted.
    pub prompt: Option<String>,

    /// TOML configuration file (endpoint, api_key, system_prompt, connect_timeout_secs)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Chat endpoint URL; overrides the config file and DSA_ASSISTANT_ENDPOINT
    #[arg(long)]
    pub endpoint: Option<String>,

    /// System instruction sent ahead of the conversation
    #[arg(long)]
    pub system: Option<String>,

    /// Start in offline mode (no requests are sent until /online)
    #[arg(long)]
    pub offline: bool,

    /// Disable colored output
    #[arg(long)]
    pub plain: bool,

    /// Print a shell completion script and exit
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,
}

/// Merge the config file, environment and command-line flags, in that order.
pub fn resolve_config(args: &Args) -> Result<AssistantConfig> {
    let base = match &args.config {
        Some(path) => AssistantConfig::from_file(path)?,
        None => AssistantConfig::default(),
    };
    Ok(apply_flags(base.with_env(), args))
}

fn apply_flags(mut config: AssistantConfig, args: &Args) -> AssistantConfig {
    if let Some(endpoint) = &args.endpoint {
        config.endpoint = Some(endpoint.clone());
    }
    if let Some(system) = &args.system {
        config.system_prompt = Some(system.clone());
    }
    config
}

/// Commands understood by the interactive session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    Clear,
    History,
    Offline,
    Online,
    Help,
    Unknown(String),
    Message(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(cmd) = trimmed.strip_prefix('/') else {
            return ReplCommand::Message(trimmed.to_string());
        };
        match cmd.to_lowercase().as_str() {
            "quit" | "exit" | "q" => ReplCommand::Quit,
            "clear" => ReplCommand::Clear,
            "history" => ReplCommand::History,
            "offline" => ReplCommand::Offline,
            "online" => ReplCommand::Online,
            "help" | "?" => ReplCommand::Help,
            _ => ReplCommand::Unknown(cmd.to_string()),
        }
    }
}
