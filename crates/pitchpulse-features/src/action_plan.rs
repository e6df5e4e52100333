//! Weekly action plan with retrieval-augmented context.

use crate::error::{FeatureError, FeatureResult};
use crate::prompt::ACTION_PLAN;
use pitchpulse_core::{FeatureSchema, FieldSpec, FieldType, GenerationRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::Write as _;

/// Feature name
pub const FEATURE: &str = "action_plan";

/// A past player-week similar to the current one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalCase {
    /// Metrics and notes of that week
    #[serde(default)]
    pub context_data: Map<String, Value>,
    /// What was done and what happened next
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// A club playbook entry, either a stored rule or plain text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaybookSnippet {
    /// Stored rule record
    Rule {
        /// Rule text
        #[serde(default)]
        rule_text: Option<String>,
    },
    /// Bare text
    Text(String),
}

impl PlaybookSnippet {
    fn text(&self) -> &str {
        match self {
            Self::Rule { rule_text } => rule_text.as_deref().unwrap_or("No rule text"),
            Self::Text(text) => text,
        }
    }
}

/// Input of the action plan feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPlanInput {
    /// Current player situation, passed through verbatim
    pub player: Value,
    /// Retrieved similar cases
    #[serde(default)]
    pub similar_cases: Vec<HistoricalCase>,
    /// Retrieved playbook guidance
    #[serde(default)]
    pub playbook: Vec<PlaybookSnippet>,
}

/// Output schema
#[must_use]
pub fn schema() -> FeatureSchema {
    FeatureSchema::new(FEATURE)
        .field(FieldSpec::required("summary", FieldType::String))
        .field(FieldSpec::required("why", FieldType::string_list()))
        .field(FieldSpec::required("recommendations", FieldType::string_list()))
        .field(FieldSpec::required("caution", FieldType::String))
        .field(FieldSpec::optional("generated_at", FieldType::String))
}

/// Static fallback
#[must_use]
pub fn fallback() -> Value {
    json!({
        "summary": "Automated action plan unavailable. Review the player's metrics manually.",
        "why": [],
        "recommendations": ["Hold current training load until staff review the latest metrics."],
        "caution": "Generated without model assistance; confirm with medical staff before changing load."
    })
}

/// Render the retrieval context block handed to the model
#[must_use]
pub fn compose_rag_context(
    player: &Value,
    cases: &[HistoricalCase],
    playbook: &[PlaybookSnippet],
) -> String {
    let mut context = String::from("CURRENT PLAYER SITUATION:\n");
    context.push_str(&serde_json::to_string_pretty(player).unwrap_or_else(|_| "{}".to_string()));
    context.push_str("\n\n");

    context.push_str("SIMILAR HISTORICAL CASES (FROM VECTOR DB):\n");
    if cases.is_empty() {
        context.push_str("No strongly matching similar cases found.\n");
    } else {
        for (idx, case) in cases.iter().enumerate() {
            let data = serde_json::to_string(&case.context_data).unwrap_or_else(|_| "{}".to_string());
            let _ = writeln!(context, "Case {}:", idx + 1);
            let _ = writeln!(context, "- Context: {data}");
            let _ = writeln!(
                context,
                "- Subsequent Intervention/Outcome: {}",
                case.outcome.as_deref().unwrap_or("Unknown")
            );
        }
    }
    context.push('\n');

    context.push_str("CLUB PLAYBOOK GUIDELINES (FROM VECTOR DB):\n");
    if playbook.is_empty() {
        context.push_str("No specific playbook guidance retrieved.\n");
    } else {
        for snippet in playbook {
            let _ = writeln!(context, "- {}", snippet.text());
        }
    }

    context
}

/// Assemble the generation request
#[must_use]
pub fn request(input: &ActionPlanInput) -> GenerationRequest {
    let context = compose_rag_context(&input.player, &input.similar_cases, &input.playbook);
    GenerationRequest::builder(FEATURE)
        .prompt(ACTION_PLAN.render(&context))
        .build()
}

/// Decode caller context and assemble the request
pub fn request_from_context(context: &Value) -> FeatureResult<GenerationRequest> {
    let input: ActionPlanInput = serde_json::from_value(context.clone())
        .map_err(|e| FeatureError::invalid_context(FEATURE, e))?;
    Ok(request(&input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fallback_is_conformant() {
        assert!(schema().is_conformant(&fallback()));
    }

    #[test]
    fn test_context_without_retrievals() {
        let context = compose_rag_context(&json!({"name": "Saka"}), &[], &[]);
        assert_eq!(
            context,
            "CURRENT PLAYER SITUATION:\n{\n  \"name\": \"Saka\"\n}\n\n\
             SIMILAR HISTORICAL CASES (FROM VECTOR DB):\n\
             No strongly matching similar cases found.\n\n\
             CLUB PLAYBOOK GUIDELINES (FROM VECTOR DB):\n\
             No specific playbook guidance retrieved.\n"
        );
    }

    #[test]
    fn test_context_with_cases_and_playbook() {
        let mut data = Map::new();
        data.insert("acwr".to_string(), json!(1.6));
        let cases = vec![
            HistoricalCase {
                context_data: data,
                outcome: Some("Load cut 30%, no injury".to_string()),
            },
            HistoricalCase::default(),
        ];
        let playbook = vec![
            PlaybookSnippet::Rule {
                rule_text: Some("ACWR above 1.5 requires a deload day".to_string()),
            },
            PlaybookSnippet::Text("Sleep below 6h flags a check-in".to_string()),
            PlaybookSnippet::Rule { rule_text: None },
        ];

        let context = compose_rag_context(&json!({}), &cases, &playbook);

        assert!(context.contains("Case 1:\n- Context: {\"acwr\":1.6}\n- Subsequent Intervention/Outcome: Load cut 30%, no injury\n"));
        assert!(context.contains("Case 2:\n- Context: {}\n- Subsequent Intervention/Outcome: Unknown\n"));
        assert!(context.contains("- ACWR above 1.5 requires a deload day\n"));
        assert!(context.contains("- Sleep below 6h flags a check-in\n"));
        assert!(context.contains("- No rule text\n"));
    }

    #[test]
    fn test_request_from_context() {
        let context = json!({
            "player": {"name": "Vinicius Jr", "risk_score": 85},
            "playbook": ["Limit sprint volume after 90+ minute matches"]
        });
        let request = request_from_context(&context).unwrap();

        assert_eq!(request.feature().as_str(), FEATURE);
        let user = request.prompt().user_text();
        assert!(user.contains("\"risk_score\": 85"));
        assert!(user.contains("- Limit sprint volume after 90+ minute matches"));
    }

    #[test]
    fn test_invalid_context() {
        let err = request_from_context(&json!({"similar_cases": "none"})).unwrap_err();
        assert!(matches!(err, FeatureError::InvalidContext { feature: FEATURE, .. }));
    }
}
