//! Command-line frontend for the Tinker coding agent.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;

use tinker_core::{Agent, AgentConfig, OpenAiClient};

mod repl;

#[derive(Parser)]
#[command(name = "tinker")]
#[command(about = "Tinker - a minimal coding agent", long_about = None)]
#[command(after_help = "\
Examples:
  tinker                         # Interactive mode in current directory
  tinker -d /path/to/project     # Interactive mode in a specific directory
  tinker -p \"list all files\"     # Single prompt mode
  tinker --model gpt-4o-mini     # Use a different model
")]
struct Cli {
    /// Working directory for the agent (default: current directory)
    #[arg(short = 'd', long, default_value = ".")]
    directory: PathBuf,

    /// Single prompt to run (non-interactive mode)
    #[arg(short = 'p', long)]
    prompt: Option<String>,

    /// Model to use
    #[arg(long, default_value = "gpt-4o")]
    model: String,

    /// Temperature for model responses
    #[arg(long, default_value_t = 0.0)]
    temperature: f32,

    /// Maximum agent loop iterations
    #[arg(long, default_value_t = 50)]
    max_turns: u32,

    /// Require confirmation for tool execution
    #[arg(long)]
    no_auto_approve: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.directory.is_dir() {
        bail!("{} is not a valid directory", cli.directory.display());
    }

    let client = OpenAiClient::from_env()?;

    let config = AgentConfig {
        model: cli.model,
        temperature: cli.temperature,
        max_turns: cli.max_turns,
        auto_approve: !cli.no_auto_approve,
        ..AgentConfig::default()
    };

    let mut agent = Agent::new(&cli.directory, Box::new(client))
        .with_config(config)
        .with_approval(Box::new(repl::PromptApproval));

    log::debug!(
        "agent ready in {} (model {})",
        agent.working_dir().display(),
        agent.config().model
    );

    match cli.prompt {
        Some(prompt) => repl::run_single(&mut agent, &prompt),
        None => repl::run_interactive(&mut agent),
    }
}
