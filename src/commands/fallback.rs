//! Fallback command - show what a feature returns when generation fails.

use anyhow::Result;
use clap::Args;
use pitchpulse_features::{movement, standard_catalog, Feature};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the fallback command.
#[derive(Args, Debug)]
pub struct FallbackArgs {
    /// Feature name
    pub feature: Feature,

    /// Request context (JSON); shows the context-derived fallback where the
    /// feature has one
    #[arg(long)]
    pub context: Option<PathBuf>,
}

/// Fallback output.
#[derive(Debug, Serialize)]
pub struct FallbackOutput {
    pub feature: String,
    pub derived: bool,
    pub value: Value,
}

/// Execute the fallback command.
pub async fn execute(args: FallbackArgs, json: bool) -> Result<()> {
    let catalog = standard_catalog()?;
    let feature = args.feature;

    let (value, derived) = match args.context {
        Some(path) => {
            let context = super::read_json(&path).await?;
            let request = feature.request_from_context(&context, movement::VIDEO_MODEL)?;
            let value = catalog.fallback_for_request(&request)?;
            let derived = &value != catalog.fallback_for(feature.as_str())?;
            (value, derived)
        }
        None => (catalog.fallback_for(feature.as_str())?.clone(), false),
    };

    let result = FallbackOutput {
        feature: feature.to_string(),
        derived,
        value,
    };

    match OutputFormat::from_json_flag(json) {
        OutputFormat::Json => CommandResult::success(result).print_json(),
        OutputFormat::Text => {
            let kind = if result.derived { "derived" } else { "static" };
            output::section(&format!("{} fallback ({kind})", result.feature));
            output::document(&result.value)
        }
    }
}
