//! # PitchPulse AI
//!
//! Command-line front end of the PitchPulse structured-generation gateway.
//!
//! ## Usage
//!
//! ```bash
//! # Inspect the output contract of every feature
//! pitchpulse-ai schemas
//!
//! # Validate configuration and the feature catalog
//! pitchpulse-ai --config pitchpulse.yaml check
//!
//! # Run one generation against Gemini
//! GEMINI_API_KEY=... pitchpulse-ai generate vitals_fusion --context checkin.json
//! ```

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;

mod bootstrap;
mod cli;
mod commands;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    cli.execute().await
}
