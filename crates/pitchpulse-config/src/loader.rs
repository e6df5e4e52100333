//! Configuration loading.

use crate::config::GatewayConfig;
use crate::error::{ConfigError, ConfigResult};
use humantime_serde::re::humantime;
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};
use validator::Validate;

/// Environment variable carrying the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Builds a [`GatewayConfig`] from a file, the environment and defaults.
///
/// Precedence: environment overrides, then the file, then built-in defaults.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
    skip_env: bool,
}

impl ConfigLoader {
    /// Create a loader with no file
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this YAML (`.yaml`/`.yml`) or TOML (`.toml`) file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Use these variables instead of the process environment
    #[must_use]
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Ignore environment overrides
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Load, override and validate
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, an override is
    /// malformed, or validation fails
    pub async fn load(self) -> ConfigResult<GatewayConfig> {
        let mut config = match &self.file {
            Some(path) => {
                info!(path = %path.display(), "Loading configuration file");
                load_file(path).await?
            }
            None => GatewayConfig::default(),
        };

        if !self.skip_env {
            let env = self.env.unwrap_or_else(|| std::env::vars().collect());
            apply_env_overrides(&mut config, &env)?;
        }

        config.validate()?;
        Ok(config)
    }
}

async fn load_file(path: &Path) -> ConfigResult<GatewayConfig> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yaml" | "yml") => GatewayConfig::from_yaml_str(&content),
        Some("toml") => GatewayConfig::from_toml_str(&content),
        other => Err(ConfigError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

fn apply_env_overrides(
    config: &mut GatewayConfig,
    env: &HashMap<String, String>,
) -> ConfigResult<()> {
    if let Some(key) = env.get(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
        config.model.api_key = Some(SecretString::new(key.trim().to_string()));
    }
    if let Some(value) = env.get("PITCHPULSE_MODEL") {
        config.model.name = value.clone();
    }
    if let Some(value) = env.get("PITCHPULSE_VIDEO_MODEL") {
        config.model.video_model = value.clone();
    }
    if let Some(value) = env.get("PITCHPULSE_BASE_URL") {
        config.model.base_url = value.clone();
    }
    if let Some(value) = parse_var::<f32>(env, "PITCHPULSE_TEMPERATURE")? {
        config.model.temperature = value;
    }
    if let Some(value) = parse_var::<u32>(env, "PITCHPULSE_MAX_ATTEMPTS")? {
        config.generation.max_attempts = value;
    }
    if let Some(value) = duration_var(env, "PITCHPULSE_ATTEMPT_TIMEOUT")? {
        config.generation.attempt_timeout = value;
    }
    if let Some(value) = duration_var(env, "PITCHPULSE_RETRY_JITTER")? {
        config.generation.retry_jitter = value;
    }
    if let Some(value) = parse_var::<u32>(env, "PITCHPULSE_MAX_CONCURRENT")? {
        config.bulkhead.max_concurrent = value;
    }
    if let Some(value) = env.get("PITCHPULSE_LOG_LEVEL") {
        config.logging.level = value.clone();
    }
    if let Some(value) = parse_var::<bool>(env, "PITCHPULSE_LOG_JSON")? {
        config.logging.json = value;
    }
    Ok(())
}

fn parse_var<T>(env: &HashMap<String, String>, name: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = env.get(name) else {
        return Ok(None);
    };
    let value = raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnv {
        name: name.to_string(),
        message: e.to_string(),
    })?;
    debug!(variable = name, "Applied environment override");
    Ok(Some(value))
}

fn duration_var(env: &HashMap<String, String>, name: &str) -> ConfigResult<Option<Duration>> {
    env.get(name)
        .map(|raw| {
            humantime::parse_duration(raw.trim()).map_err(|e| ConfigError::InvalidEnv {
                name: name.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}
