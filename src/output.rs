//! Terminal and JSON rendering for the CLI.

use colored::Colorize;
use pitchpulse_core::GenerationResult;
use serde::Serialize;
use serde_json::Value;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Coloured text for a terminal.
    Text,
    /// One JSON envelope on stdout.
    Json,
}

impl OutputFormat {
    /// Pick the format from the global `--json` flag.
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            Self::Json
        } else {
            Self::Text
        }
    }
}

pub fn success(message: &str) {
    println!("{} {message}", "✓".green().bold());
}

pub fn error(message: &str) {
    eprintln!("{} {message}", "✗".red().bold());
}

pub fn warning(message: &str) {
    eprintln!("{} {message}", "⚠".yellow().bold());
}

/// Indented `key: value` line.
pub fn key_value(key: &str, value: &str) {
    println!("  {}: {value}", key.bold());
}

/// Underlined heading preceded by a blank line.
pub fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Pretty-printed JSON document.
pub fn document(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Headline of a generation: green when the model answered, yellow with the
/// failure reason when the fallback was served.
pub fn generation_outcome(feature: &str, result: &GenerationResult) {
    match result.fallback_reason() {
        None => success(&format!("{feature}: conformant model output")),
        Some(reason) => warning(&format!(
            "{feature}: fallback served ({})",
            reason.as_str().yellow()
        )),
    }
}

/// JSON envelope printed with `--json`.
#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Failed command that still reports what it found.
    pub fn failure(data: T, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(error.into()),
        }
    }

    pub fn print_json(&self) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(self)?);
        Ok(())
    }
}
