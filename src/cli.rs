//! CLI argument definitions using clap.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::bootstrap;
use crate::commands;

/// PitchPulse AI - strict-JSON generation for the PitchPulse features
#[derive(Parser, Debug)]
#[command(name = "pitchpulse-ai")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (YAML or TOML)
    #[arg(short, long, env = "PITCHPULSE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the output schema of one or all features
    Schemas(commands::schemas::SchemasArgs),

    /// Show the fallback value of a feature
    Fallback(commands::fallback::FallbackArgs),

    /// Validate configuration and the feature catalog
    Check(commands::check::CheckArgs),

    /// Run a generation against the configured model
    Generate(commands::generate::GenerateArgs),

    /// Search the bundled knowledge base for similar cases
    Cases(commands::cases::CasesArgs),
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        let config = bootstrap::load_config(self.config.as_deref()).await;
        bootstrap::init_tracing(config.as_ref().ok(), self.verbose, self.json);

        match self.command {
            Commands::Schemas(args) => commands::schemas::execute(&args, self.json),
            Commands::Fallback(args) => commands::fallback::execute(args, self.json).await,
            Commands::Check(args) => commands::check::execute(&args, config, self.json),
            Commands::Generate(args) => commands::generate::execute(args, config?, self.json).await,
            Commands::Cases(args) => commands::cases::execute(args, config?, self.json).await,
        }
    }
}
