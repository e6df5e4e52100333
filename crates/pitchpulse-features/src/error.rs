//! Feature-level errors.

use pitchpulse_core::GatewayError;
use thiserror::Error;

/// Errors raised while turning caller input into a generation request
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The name matches no PitchPulse feature
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    /// Caller context could not be read as the feature's input
    #[error("Invalid context for {feature}: {source}")]
    InvalidContext {
        /// Feature being assembled
        feature: &'static str,
        /// Underlying decode error
        #[source]
        source: serde_json::Error,
    },

    /// Gateway or catalog error
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl FeatureError {
    pub(crate) fn invalid_context(feature: &'static str, source: serde_json::Error) -> Self {
        Self::InvalidContext { feature, source }
    }
}

/// Result alias for feature operations
pub type FeatureResult<T> = Result<T, FeatureError>;
