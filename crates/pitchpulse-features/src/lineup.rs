//! Suggested starting XI.

use crate::error::{FeatureError, FeatureResult};
use crate::prompt::SUGGESTED_XI;
use pitchpulse_core::{FeatureSchema, FieldSpec, FieldType, GenerationRequest, OutputRule};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::cmp::Ordering;
use tracing::debug;

/// Feature name
pub const FEATURE: &str = "suggested_xi";

/// Formations the model may pick
pub const FORMATIONS: [&str; 7] = ["4-3-3", "4-4-2", "4-2-3-1", "3-5-2", "3-4-3", "5-3-2", "5-4-1"];

const XI_SIZE: usize = 11;
const FALLBACK_FORMATION: &str = "4-3-3";
const DEFAULT_RISK: f64 = 50.0;

/// Form label derived from an injury risk score
#[must_use]
pub fn form_from_risk(risk: f64) -> &'static str {
    if risk <= 25.0 {
        "Excellent"
    } else if risk <= 45.0 {
        "Good"
    } else if risk <= 65.0 {
        "Average"
    } else {
        "Poor"
    }
}

/// One available player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SquadPlayer {
    /// Player id
    pub id: String,
    /// Display name
    pub name: String,
    /// Position group: `GK`, `DEF`, `MID` or `FW`
    pub position: String,
    /// Readiness (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readiness: Option<f64>,
    /// Form label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    /// Injury risk (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<f64>,
}

impl SquadPlayer {
    fn readiness_or_zero(&self) -> f64 {
        self.readiness.unwrap_or(0.0)
    }

    fn rationale(&self) -> String {
        let readiness = self
            .readiness
            .map_or_else(|| "?".to_string(), |r| r.to_string());
        let risk = self.risk.map_or_else(|| "N/A".to_string(), |r| r.to_string());
        format!(
            "{} selected — Readiness: {readiness}%, Form: {}, Risk: {risk}.",
            self.name,
            self.form.as_deref().unwrap_or("N/A")
        )
    }
}

/// Input of the suggested XI feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedXiInput {
    /// Opposing team
    #[serde(default)]
    pub opponent: String,
    /// Venue and competition (e.g. "Away, Champions League Semi-Final")
    #[serde(default)]
    pub match_context: String,
    /// Players available for selection
    #[serde(default)]
    pub available_squad: Vec<SquadPlayer>,
}

impl SuggestedXiInput {
    /// Copy of the input where every player carries a form label
    #[must_use]
    pub fn normalized(&self) -> Self {
        let available_squad = self
            .available_squad
            .iter()
            .map(|player| {
                let mut player = player.clone();
                if player.form.is_none() {
                    let risk = player.risk.unwrap_or(DEFAULT_RISK);
                    player.form = Some(form_from_risk(risk).to_string());
                }
                player
            })
            .collect();
        Self {
            available_squad,
            ..self.clone()
        }
    }
}

/// Output schema. The model must name a full eleven; the empty list is
/// reserved for the no-squad fallback.
#[must_use]
pub fn schema() -> FeatureSchema {
    FeatureSchema::new(FEATURE)
        .field(FieldSpec::required(
            "best_formation",
            FieldType::enumeration(FORMATIONS),
        ))
        .field(FieldSpec::required("tactical_analysis", FieldType::String))
        .field(FieldSpec::required(
            "starting_xi_ids",
            FieldType::string_list_max(XI_SIZE),
        ))
        .field(FieldSpec::required("bench_ids", FieldType::string_list()))
        .field(FieldSpec::required("player_rationales", FieldType::StringMap))
        .output_rule(OutputRule::item_count("starting_xi_ids", XI_SIZE))
}

/// Static fallback, used when no squad is available
#[must_use]
pub fn fallback() -> Value {
    json!({
        "best_formation": FALLBACK_FORMATION,
        "tactical_analysis": "Automated lineup suggestion unavailable. Manual selection required.",
        "starting_xi_ids": [],
        "bench_ids": [],
        "player_rationales": {}
    })
}

fn by_readiness_desc(a: &&SquadPlayer, b: &&SquadPlayer) -> Ordering {
    b.readiness_or_zero()
        .partial_cmp(&a.readiness_or_zero())
        .unwrap_or(Ordering::Equal)
}

/// Deterministic selection: best GK, 4 DEF, 3 MID, 3 FW by readiness, topped
/// up to eleven from the rest; everyone else is on the bench
#[must_use]
pub fn select_fallback_xi(squad: &[SquadPlayer]) -> Value {
    let mut xi: Vec<&SquadPlayer> = Vec::with_capacity(XI_SIZE);
    for (position, quota) in [("GK", 1), ("DEF", 4), ("MID", 3), ("FW", 3)] {
        let mut group: Vec<&SquadPlayer> =
            squad.iter().filter(|p| p.position == position).collect();
        group.sort_by(by_readiness_desc);
        xi.extend(group.into_iter().take(quota));
    }

    if xi.len() < XI_SIZE {
        let mut remaining: Vec<&SquadPlayer> = squad
            .iter()
            .filter(|p| !xi.iter().any(|chosen| chosen.id == p.id))
            .collect();
        remaining.sort_by(by_readiness_desc);
        let missing = XI_SIZE - xi.len();
        xi.extend(remaining.into_iter().take(missing));
    }
    xi.truncate(XI_SIZE);

    let bench: Vec<&str> = squad
        .iter()
        .filter(|p| !xi.iter().any(|chosen| chosen.id == p.id))
        .map(|p| p.id.as_str())
        .collect();

    let rationales: Map<String, Value> = xi
        .iter()
        .map(|p| (p.id.clone(), Value::String(p.rationale())))
        .collect();

    json!({
        "best_formation": FALLBACK_FORMATION,
        "tactical_analysis": "Fallback selection: top readiness players selected in a balanced 4-3-3 formation.",
        "starting_xi_ids": xi.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(),
        "bench_ids": bench,
        "player_rationales": rationales,
    })
}

/// Context-derived fallback: the readiness-ranked selection of the squad
#[must_use]
pub fn derived_fallback(context: &Value) -> Option<Value> {
    let input: SuggestedXiInput = serde_json::from_value(context.clone()).ok()?;
    if input.available_squad.is_empty() {
        return None;
    }
    Some(select_fallback_xi(&input.normalized().available_squad))
}

/// Assemble the generation request; the normalised input is kept as context
#[must_use]
pub fn request(input: &SuggestedXiInput) -> GenerationRequest {
    let normalized = input.normalized();
    let rendered = serde_json::to_string_pretty(&normalized).unwrap_or_else(|_| "{}".to_string());
    debug!(
        players = normalized.available_squad.len(),
        opponent = %normalized.opponent,
        "Assembled suggested XI request"
    );

    let mut builder = GenerationRequest::builder(FEATURE).prompt(SUGGESTED_XI.render(&rendered));
    if let Ok(raw) = serde_json::to_value(&normalized) {
        builder = builder.context(raw);
    }
    builder.build()
}

/// Decode caller context and assemble the request
pub fn request_from_context(context: &Value) -> FeatureResult<GenerationRequest> {
    let input: SuggestedXiInput = serde_json::from_value(context.clone())
        .map_err(|e| FeatureError::invalid_context(FEATURE, e))?;
    Ok(request(&input))
}
