//! Check command - validate configuration and the feature catalog.

use anyhow::Result;
use clap::Args;
use pitchpulse_config::GatewayConfig;
use pitchpulse_features::standard_catalog;
use serde::Serialize;

use crate::output::{self, CommandResult, OutputFormat};

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Treat warnings as errors
    #[arg(long)]
    pub strict: bool,
}

/// Check result.
#[derive(Debug, Default, Serialize)]
pub struct CheckResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
    pub features: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Execute the check command.
pub fn execute(args: &CheckArgs, config: Result<GatewayConfig>, json: bool) -> Result<()> {
    let mut result = CheckResult::default();

    match config {
        Ok(config) => inspect_config(&config, &mut result),
        Err(e) => result.errors.push(format!("{e:#}")),
    }

    match standard_catalog() {
        Ok(catalog) => {
            result.features = catalog.features().iter().map(ToString::to_string).collect();
        }
        Err(e) => result.errors.push(format!("Feature catalog is inconsistent: {e}")),
    }

    result.valid = result.errors.is_empty() && !(args.strict && !result.warnings.is_empty());
    let valid = result.valid;
    print_result(result, OutputFormat::from_json_flag(json))?;

    if !valid {
        std::process::exit(1);
    }
    Ok(())
}

fn inspect_config(config: &GatewayConfig, result: &mut CheckResult) {
    result.model = Some(config.model.name.clone());
    result.video_model = Some(config.model.video_model.clone());
    result.max_attempts = Some(config.generation.max_attempts);

    if !config.has_api_key() {
        result
            .warnings
            .push("GEMINI_API_KEY is not set; generation will fail".to_string());
    }
    if config.model.request_timeout < config.generation.attempt_timeout {
        result.warnings.push(format!(
            "model.request_timeout ({:?}) is shorter than generation.attempt_timeout ({:?})",
            config.model.request_timeout, config.generation.attempt_timeout
        ));
    }
}

fn print_result(result: CheckResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            if result.valid {
                CommandResult::success(result).print_json()
            } else {
                CommandResult::failure(result, "Check failed").print_json()
            }
        }
        OutputFormat::Text => {
            if result.valid {
                output::success("Configuration is valid");
            } else {
                output::error("Configuration is invalid");
            }

            if let Some(ref model) = result.model {
                output::key_value("Model", model);
            }
            if let Some(ref video_model) = result.video_model {
                output::key_value("Video model", video_model);
            }
            if let Some(max_attempts) = result.max_attempts {
                output::key_value("Max attempts", &max_attempts.to_string());
            }
            output::key_value("Features", &result.features.join(", "));

            if !result.errors.is_empty() {
                output::section("Errors");
                for error in &result.errors {
                    output::error(error);
                }
            }
            if !result.warnings.is_empty() {
                output::section("Warnings");
                for warning in &result.warnings {
                    output::warning(warning);
                }
            }
            Ok(())
        }
    }
}
