//! Error types for the gateway.
//!
//! Only configuration mistakes and cancellation ever reach a caller of
//! `generate`; the remaining variants describe upstream failures and are
//! absorbed by the retry loop.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway error type
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No schema or fallback is registered under the feature name
    #[error("Unknown feature: {feature}")]
    UnknownFeature {
        /// The feature that was looked up
        feature: String,
    },

    /// A feature was registered twice
    #[error("Feature already registered: {feature}")]
    DuplicateFeature {
        /// The feature that was registered twice
        feature: String,
    },

    /// Registered features without a fallback
    #[error("Features without a registered fallback: {}", features.join(", "))]
    MissingFallback {
        /// Feature names lacking a fallback
        features: Vec<String>,
    },

    /// A static fallback does not satisfy its own schema
    #[error("Fallback for feature '{feature}' is not schema-conformant: {details}")]
    NonConformantFallback {
        /// The feature whose fallback is broken
        feature: String,
        /// Rendered schema violations
        details: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Upstream model error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider identifier
        provider: String,
        /// Error message
        message: String,
        /// HTTP status code, when the call reached the provider
        status_code: Option<u16>,
        /// Whether the provider signalled a transient condition
        retryable: bool,
    },

    /// Operation timed out
    #[error("Operation timed out after {timeout:?}")]
    Timeout {
        /// The elapsed budget
        timeout: Duration,
    },

    /// Upstream rate limit
    #[error("Rate limit exceeded")]
    RateLimit {
        /// Suggested wait before retrying
        retry_after: Option<Duration>,
    },

    /// The caller cancelled the operation
    #[error("Generation cancelled by caller")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl GatewayError {
    /// Create an unknown feature error
    #[must_use]
    pub fn unknown_feature(feature: impl Into<String>) -> Self {
        Self::UnknownFeature {
            feature: feature.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a provider error
    #[must_use]
    pub fn provider(
        provider: impl Into<String>,
        message: impl Into<String>,
        status_code: Option<u16>,
        retryable: bool,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
            retryable,
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    /// Create a rate limit error
    #[must_use]
    pub fn rate_limit(retry_after: Option<Duration>) -> Self {
        Self::RateLimit { retry_after }
    }

    /// Create an internal error
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the upstream signalled a transient condition
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Provider { retryable, .. } => *retryable,
            Self::Timeout { .. } | Self::RateLimit { .. } => true,
            _ => false,
        }
    }

    /// Whether the error is a wiring mistake rather than a runtime condition
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownFeature { .. }
                | Self::DuplicateFeature { .. }
                | Self::MissingFallback { .. }
                | Self::NonConformantFallback { .. }
                | Self::Configuration { .. }
        )
    }

    /// Short machine-readable error code
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownFeature { .. } => "unknown_feature",
            Self::DuplicateFeature { .. } => "duplicate_feature",
            Self::MissingFallback { .. } => "missing_fallback",
            Self::NonConformantFallback { .. } => "non_conformant_fallback",
            Self::Configuration { .. } => "configuration_error",
            Self::Provider { .. } => "provider_error",
            Self::Timeout { .. } => "timeout",
            Self::RateLimit { .. } => "rate_limit_exceeded",
            Self::Cancelled => "cancelled",
            Self::Internal { .. } => "internal_error",
        }
    }
}
