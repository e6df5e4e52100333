//! CLI commands module.

pub mod cases;
pub mod check;
pub mod fallback;
pub mod generate;
pub mod schemas;

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;

/// Read a JSON document from disk
pub async fn read_json(path: &Path) -> Result<Value> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{} is not valid JSON", path.display()))
}
