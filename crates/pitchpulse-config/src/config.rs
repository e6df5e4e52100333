//! Configuration model.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GatewayConfig {
    /// Upstream model settings
    #[validate(nested)]
    pub model: ModelSection,

    /// Attempt budget and timeouts
    #[validate(nested)]
    pub generation: GenerationSection,

    /// Upstream concurrency limits
    #[validate(nested)]
    pub bulkhead: BulkheadSection,

    /// Logging
    #[validate(nested)]
    pub logging: LoggingSection,
}

/// Upstream model settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ModelSection {
    /// Gemini API key; usually supplied through `GEMINI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<SecretString>,

    /// Text model
    #[validate(length(min = 1))]
    pub name: String,

    /// Model used for video analysis
    #[validate(length(min = 1))]
    pub video_model: String,

    /// Embedding model
    #[validate(length(min = 1))]
    pub embedding_model: String,

    /// API base URL
    #[validate(custom(function = "validate_base_url"))]
    pub base_url: String,

    /// Sampling temperature
    #[validate(range(min = 0.0, max = 2.0))]
    pub temperature: f32,

    /// HTTP client timeout; the per-attempt timeout normally fires first
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "validate_non_zero"))]
    pub request_timeout: Duration,

    /// Pause between state polls of an uploaded clip
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "validate_non_zero"))]
    pub file_poll_interval: Duration,

    /// How long an uploaded clip may stay in processing
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "validate_non_zero"))]
    pub file_processing_timeout: Duration,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            api_key: None,
            name: "gemini-2.5-flash".to_string(),
            video_model: "gemini-2.5-pro".to_string(),
            embedding_model: "models/gemini-embedding-001".to_string(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            temperature: 0.1,
            request_timeout: Duration::from_secs(30),
            file_poll_interval: Duration::from_secs(2),
            file_processing_timeout: Duration::from_secs(120),
        }
    }
}

/// Attempt budget and timeouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GenerationSection {
    /// Total upstream attempts per generation
    #[validate(range(min = 1, max = 5))]
    pub max_attempts: u32,

    /// Independent timeout of each attempt
    #[serde(with = "humantime_serde")]
    #[validate(custom(function = "validate_non_zero"))]
    pub attempt_timeout: Duration,

    /// Upper bound of the pause between attempts
    #[serde(with = "humantime_serde")]
    pub retry_jitter: Duration,
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(8),
            retry_jitter: Duration::from_millis(200),
        }
    }
}

/// Upstream concurrency limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BulkheadSection {
    /// Concurrent upstream calls
    #[validate(range(min = 1))]
    pub max_concurrent: u32,

    /// Callers allowed to queue for a slot
    pub queue_size: u32,

    /// How long a queued caller waits
    #[serde(with = "humantime_serde")]
    pub queue_timeout: Duration,
}

impl Default for BulkheadSection {
    fn default() -> Self {
        Self {
            max_concurrent: 32,
            queue_size: 64,
            queue_timeout: Duration::from_secs(2),
        }
    }
}

/// Logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive (`info`, `pitchpulse_gateway=debug,warn`, ...)
    #[validate(length(min = 1))]
    pub level: String,

    /// JSON log lines
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl GatewayConfig {
    /// Parse a YAML document
    ///
    /// # Errors
    /// Returns error if the document does not parse
    pub fn from_yaml_str(content: &str) -> Result<Self, crate::ConfigError> {
        serde_yaml::from_str(content).map_err(|e| crate::ConfigError::Parse(e.to_string()))
    }

    /// Parse a TOML document
    ///
    /// # Errors
    /// Returns error if the document does not parse
    pub fn from_toml_str(content: &str) -> Result<Self, crate::ConfigError> {
        toml::from_str(content).map_err(|e| crate::ConfigError::Parse(e.to_string()))
    }

    /// Whether an API key is configured
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        self.model.api_key.is_some()
    }
}

fn validate_base_url(value: &str) -> Result<(), ValidationError> {
    match url::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ValidationError::new("invalid_base_url")),
    }
}

fn validate_non_zero(value: &Duration) -> Result<(), ValidationError> {
    if value.is_zero() {
        Err(ValidationError::new("zero_duration"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.model.name, "gemini-2.5-flash");
        assert!((config.model.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.generation.max_attempts, 2);
        assert_eq!(config.generation.attempt_timeout, Duration::from_secs(8));
        assert_eq!(config.generation.retry_jitter, Duration::from_millis(200));
        assert_eq!(config.bulkhead.max_concurrent, 32);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = GatewayConfig::from_yaml_str(
            r#"
generation:
  max_attempts: 3
  attempt_timeout: 5s
"#,
        )
        .unwrap();

        assert_eq!(config.generation.max_attempts, 3);
        assert_eq!(config.generation.attempt_timeout, Duration::from_secs(5));
        assert_eq!(config.generation.retry_jitter, Duration::from_millis(200));
        assert_eq!(config.model.name, "gemini-2.5-flash");
    }

    #[test]
    fn test_toml() {
        let config = GatewayConfig::from_toml_str(
            r#"
[model]
name = "gemini-2.5-pro"
temperature = 0.3
file_poll_interval = "500ms"

[bulkhead]
max_concurrent = 4
queue_timeout = "500ms"
"#,
        )
        .unwrap();

        assert_eq!(config.model.name, "gemini-2.5-pro");
        assert_eq!(config.model.file_poll_interval, Duration::from_millis(500));
        assert_eq!(config.model.file_processing_timeout, Duration::from_secs(120));
        assert_eq!(config.bulkhead.max_concurrent, 4);
        assert_eq!(config.bulkhead.queue_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = GatewayConfig::default();
        config.generation.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.model.base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.generation.attempt_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.model.temperature = 3.5;
        assert!(config.validate().is_err());

        let mut config = GatewayConfig::default();
        config.model.file_poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = GatewayConfig::default();
        config.model.api_key = Some(SecretString::new("secret-key".to_string()));

        let rendered = serde_yaml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret-key"));
        assert!(config.has_api_key());
    }
}
