//! Wiring from configuration to a ready gateway.

use anyhow::{Context, Result};
use pitchpulse_config::{ConfigLoader, GatewayConfig};
use pitchpulse_gateway::GenerationGateway;
use pitchpulse_features::movement;
use pitchpulse_providers::{GeminiClient, GeminiConfig, GeminiEmbedder, GeminiFiles, UploadedFile};
use pitchpulse_resilience::{Bulkhead, BulkheadConfig, RetryPolicy, RetryPolicyBuilder};
use pitchpulse_telemetry::{init_logging, LoggingConfig};
use secrecy::ExposeSecret;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Load the configuration file (if any) with environment overrides applied
pub async fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    loader.load().await.context("Failed to load configuration")
}

/// Logging settings: `-v` flags win over the configured level
pub fn logging_config(config: Option<&GatewayConfig>, verbose: u8, json: bool) -> LoggingConfig {
    let level = match verbose {
        0 => config.map_or_else(|| "warn".to_string(), |c| c.logging.level.clone()),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let json_logs = json || config.is_some_and(|c| c.logging.json);

    LoggingConfig::new(level)
        .with_json(json_logs)
        .with_target(verbose > 1)
}

/// Install the tracing subscriber; a failure is reported but not fatal
pub fn init_tracing(config: Option<&GatewayConfig>, verbose: u8, json: bool) {
    if let Err(e) = init_logging(&logging_config(config, verbose, json)) {
        eprintln!("{e}");
    }
}

fn gemini_config(config: &GatewayConfig) -> Result<GeminiConfig> {
    let api_key = config
        .model
        .api_key
        .as_ref()
        .context("GEMINI_API_KEY is not set")?;

    Ok(GeminiConfig::new(api_key.expose_secret().as_str())
        .with_model(&config.model.name)
        .with_embedding_model(&config.model.embedding_model)
        .with_base_url(&config.model.base_url)
        .with_temperature(config.model.temperature)
        .with_timeout(config.model.request_timeout))
}

/// Attempt budget from the `generation` section
pub fn retry_policy(config: &GatewayConfig) -> RetryPolicy {
    RetryPolicyBuilder::new()
        .max_attempts(config.generation.max_attempts)
        .attempt_timeout(config.generation.attempt_timeout)
        .jitter(config.generation.retry_jitter)
        .build()
}

/// Upstream concurrency limit from the `bulkhead` section
pub fn bulkhead(config: &GatewayConfig) -> Bulkhead {
    Bulkhead::new(
        "gemini",
        BulkheadConfig {
            max_concurrent: config.bulkhead.max_concurrent,
            queue_size: config.bulkhead.queue_size,
            queue_timeout: config.bulkhead.queue_timeout,
        },
    )
}

/// Gateway over the Gemini client with every PitchPulse feature registered
pub fn build_gateway(config: &GatewayConfig) -> Result<GenerationGateway> {
    let catalog = pitchpulse_features::standard_catalog()?;
    let client = GeminiClient::new(gemini_config(config)?)?;

    let gateway = GenerationGateway::builder(catalog, Arc::new(client))
        .retry_policy(retry_policy(config))
        .bulkhead(Arc::new(bulkhead(config)))
        .build()?;

    info!(
        model = %config.model.name,
        max_attempts = config.generation.max_attempts,
        "Gateway initialized"
    );
    Ok(gateway)
}

/// Gemini embedding client
pub fn build_embedder(config: &GatewayConfig) -> Result<GeminiEmbedder> {
    Ok(GeminiEmbedder::new(gemini_config(config)?)?)
}

/// Files API client with the configured polling
pub fn build_files(config: &GatewayConfig) -> Result<GeminiFiles> {
    Ok(GeminiFiles::new(gemini_config(config)?)?
        .with_poll_interval(config.model.file_poll_interval)
        .with_processing_timeout(config.model.file_processing_timeout))
}

/// Upload a local clip and wait until it can be referenced from a prompt
pub async fn upload_clip(config: &GatewayConfig, path: &Path) -> Result<UploadedFile> {
    let files = build_files(config)?;
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read clip {}", path.display()))?;
    let display_name = path
        .file_name()
        .map_or_else(|| "clip".to_string(), |name| name.to_string_lossy().into_owned());
    let mime_type = movement::clip_mime_type(&display_name);

    let file = files
        .upload_and_wait(bytes, mime_type, &display_name)
        .await
        .with_context(|| format!("Failed to upload clip {}", path.display()))?;
    info!(name = %file.name, uri = %file.uri, "Clip uploaded");
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use std::time::Duration;

    #[test]
    fn test_verbosity_overrides_configured_level() {
        let mut config = GatewayConfig::default();
        config.logging.level = "error".to_string();

        assert_eq!(logging_config(Some(&config), 0, false).level, "error");
        assert_eq!(logging_config(Some(&config), 2, false).level, "debug");
        assert_eq!(logging_config(None, 0, false).level, "warn");
        assert!(logging_config(None, 0, true).json);
    }

    #[test]
    fn test_policies_follow_config() {
        let mut config = GatewayConfig::default();
        config.generation.max_attempts = 3;
        config.generation.attempt_timeout = Duration::from_secs(5);
        config.bulkhead.max_concurrent = 4;

        let retry = retry_policy(&config);
        assert_eq!(retry.max_attempts(), 3);
        assert_eq!(retry.attempt_timeout(), Duration::from_secs(5));
        assert_eq!(bulkhead(&config).stats().max_concurrent, 4);
    }

    #[test]
    fn test_gateway_requires_api_key() {
        let config = GatewayConfig::default();
        let err = build_gateway(&config).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_files_client_requires_api_key() {
        let err = build_files(&GatewayConfig::default()).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_gateway_builds_with_key() {
        let mut config = GatewayConfig::default();
        config.model.api_key = Some(SecretString::new("test-key".to_string()));

        let gateway = build_gateway(&config).unwrap();
        assert_eq!(gateway.catalog().features().len(), 5);
        assert_eq!(gateway.retry_policy().max_attempts(), 2);
    }
}
