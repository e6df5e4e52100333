//! Generation result types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Category of the failure that exhausted the attempt budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// The attempt exceeded its timeout
    Timeout,
    /// The upstream call itself failed (network, HTTP status, blocked output)
    CallError,
    /// The payload could not be parsed as JSON
    MalformedPayload,
    /// The payload parsed but broke the feature schema
    SchemaValidation,
}

impl FailureReason {
    /// Stable string form used in logs, metrics and API responses
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::CallError => "call_error",
            Self::MalformedPayload => "malformed_payload",
            Self::SchemaValidation => "schema_validation",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one `generate` call.
///
/// Callers only ever see these two tags, never raw model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    /// The model produced a schema-conformant value
    Conformant {
        /// The validated payload
        value: Value,
    },
    /// Generation failed within the budget; a fallback value is returned
    Fallback {
        /// The fallback payload (schema-conformant)
        value: Value,
        /// Category of the last failure
        reason: FailureReason,
    },
}

impl GenerationResult {
    /// Wrap a conformant value
    #[must_use]
    pub fn conformant(value: Value) -> Self {
        Self::Conformant { value }
    }

    /// Wrap a fallback value
    #[must_use]
    pub fn fallback(value: Value, reason: FailureReason) -> Self {
        Self::Fallback { value, reason }
    }

    /// The payload, whichever tag it carries
    #[must_use]
    pub fn value(&self) -> &Value {
        match self {
            Self::Conformant { value } | Self::Fallback { value, .. } => value,
        }
    }

    /// Consume the result and return the payload
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Conformant { value } | Self::Fallback { value, .. } => value,
        }
    }

    /// Whether the value came from the model
    #[must_use]
    pub fn is_conformant(&self) -> bool {
        matches!(self, Self::Conformant { .. })
    }

    /// Failure reason, for fallback results
    #[must_use]
    pub fn fallback_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Conformant { .. } => None,
            Self::Fallback { reason, .. } => Some(*reason),
        }
    }
}
