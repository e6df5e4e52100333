//! Post-match squad workload report.

use crate::error::{FeatureError, FeatureResult};
use crate::prompt::MATCH_REPORT;
use pitchpulse_core::{FeatureSchema, FieldSpec, FieldType, GenerationRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Feature name
pub const FEATURE: &str = "match_report";

/// Input of the match report feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchReportInput {
    /// Opponent, score, competition
    #[serde(default)]
    pub fixture: Value,
    /// Team-level physical stats
    #[serde(default)]
    pub team_performance: Value,
    /// Per-player minutes and load flags
    #[serde(default)]
    pub player_loads: Vec<Value>,
}

/// Output schema
#[must_use]
pub fn schema() -> FeatureSchema {
    FeatureSchema::new(FEATURE)
        .field(FieldSpec::required("match_summary", FieldType::String))
        .field(FieldSpec::required("squad_load_assessment", FieldType::String))
        .field(FieldSpec::required("critical_flags", FieldType::string_list()))
        .field(FieldSpec::optional("recommendations", FieldType::string_list()))
}

/// Static fallback
#[must_use]
pub fn fallback() -> Value {
    json!({
        "match_summary": "Automated match report unavailable.",
        "squad_load_assessment": "Review individual player loads manually before planning recovery.",
        "critical_flags": []
    })
}

/// Assemble the generation request
#[must_use]
pub fn request(input: &MatchReportInput) -> GenerationRequest {
    let context = serde_json::to_string_pretty(input).unwrap_or_else(|_| "{}".to_string());
    GenerationRequest::builder(FEATURE)
        .prompt(MATCH_REPORT.render(&context))
        .build()
}

/// Decode caller context and assemble the request
pub fn request_from_context(context: &Value) -> FeatureResult<GenerationRequest> {
    let input: MatchReportInput = serde_json::from_value(context.clone())
        .map_err(|e| FeatureError::invalid_context(FEATURE, e))?;
    Ok(request(&input))
}
