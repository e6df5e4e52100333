//! Camera check-in vitals fusion.
//!
//! A rule-based assessment runs before any model call. It is included in the
//! prompt as a reference and doubles as the context-derived fallback.

use crate::error::{FeatureError, FeatureResult};
use crate::prompt::VITALS;
use pitchpulse_core::{FeatureSchema, FieldSpec, FieldType, GenerationRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

/// Feature name
pub const FEATURE: &str = "vitals_fusion";

const DELTA_MIN: f64 = -15.0;
const DELTA_MAX: f64 = 10.0;
const MAX_FACTORS: usize = 3;

/// Readiness flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReadinessFlag {
    /// Cleared
    Good,
    /// Needs monitoring
    Concern,
    /// Needs medical review
    Alert,
}

impl ReadinessFlag {
    /// Standard recommendation for the flag
    #[must_use]
    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Alert => {
                "Escalate to medical staff. Do not include in high-intensity training today."
            }
            Self::Concern => {
                "Monitor closely. Reduce training load by 20% and re-assess before match day."
            }
            Self::Good => "Player cleared for full training. No readiness concerns detected.",
        }
    }

    fn at_least_concern(self) -> Self {
        match self {
            Self::Good => Self::Concern,
            other => other,
        }
    }
}

/// Resting reference values of a player
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Baselines {
    /// Resting pulse, bpm
    pub resting_pulse_rate: f64,
    /// HRV (RMSSD), ms
    pub hrv_ms: f64,
    /// Breaths per minute at rest
    pub breathing_rate: f64,
}

impl Default for Baselines {
    fn default() -> Self {
        Self {
            resting_pulse_rate: 62.0,
            hrv_ms: 65.0,
            breathing_rate: 14.0,
        }
    }
}

/// Contactless vitals from the selfie check-in; absent readings are 0
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vitals {
    /// Pulse, bpm
    pub pulse_rate: f64,
    /// HRV, ms
    pub hrv_ms: f64,
    /// Breaths per minute
    pub breathing_rate: f64,
    /// Measurement confidence in [0, 1]
    pub confidence: f64,
}

fn default_unknown() -> String {
    "Unknown".to_string()
}

fn default_score() -> f64 {
    50.0
}

fn default_acwr() -> f64 {
    1.0
}

/// Player workload snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    /// Display name
    #[serde(default = "default_unknown")]
    pub name: String,
    /// Playing position
    #[serde(default = "default_unknown")]
    pub position: String,
    /// Current injury risk score (0-100)
    #[serde(default = "default_score")]
    pub risk_score: f64,
    /// Current readiness score (0-100)
    #[serde(default = "default_score")]
    pub readiness_score: f64,
    /// Acute:chronic workload ratio
    #[serde(default = "default_acwr")]
    pub acwr: f64,
    /// Minutes played in the last match
    #[serde(default)]
    pub last_match_minutes: f64,
    /// Personal baselines; population defaults when absent
    #[serde(default)]
    pub baselines: Option<Baselines>,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            name: default_unknown(),
            position: default_unknown(),
            risk_score: default_score(),
            readiness_score: default_score(),
            acwr: default_acwr(),
            last_match_minutes: 0.0,
            baselines: None,
        }
    }
}

/// Input of the vitals fusion feature
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VitalsInput {
    /// Player snapshot
    #[serde(default)]
    pub player: PlayerSnapshot,
    /// Check-in readings
    #[serde(default)]
    pub vitals: Vitals,
}

impl VitalsInput {
    fn baselines(&self) -> Baselines {
        self.player.baselines.unwrap_or_default()
    }
}

/// Outcome of the rule-based assessment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeuristicAssessment {
    /// Readiness adjustment, clamped to [-15, 10] and rounded to 0.1
    pub readiness_delta: f64,
    /// Flag
    pub readiness_flag: ReadinessFlag,
    /// At most three explanations
    pub contributing_factors: Vec<String>,
}

impl HeuristicAssessment {
    /// Schema-shaped value with the flag's standard recommendation
    #[must_use]
    pub fn to_output(&self) -> Value {
        json!({
            "readiness_delta": self.readiness_delta,
            "readiness_flag": self.readiness_flag,
            "contributing_factors": self.contributing_factors,
            "recommendation": self.readiness_flag.recommendation(),
        })
    }
}

/// Rule-based readiness assessment
#[must_use]
pub fn assess(vitals: &Vitals, baselines: &Baselines) -> HeuristicAssessment {
    let mut delta = 0.0_f64;
    let mut flag = ReadinessFlag::Good;
    let mut factors = Vec::new();

    let baseline_pulse = baselines.resting_pulse_rate;
    if vitals.pulse_rate > 0.0 {
        let diff = vitals.pulse_rate - baseline_pulse;
        if diff > 20.0 {
            delta -= 10.0;
            flag = ReadinessFlag::Alert;
            factors.push(format!(
                "Resting HR elevated +{diff}bpm above baseline ({baseline_pulse}bpm)"
            ));
        } else if diff > 10.0 {
            delta -= 5.0;
            flag = flag.at_least_concern();
            factors.push(format!(
                "Resting HR moderately elevated +{diff}bpm above baseline ({baseline_pulse}bpm)"
            ));
        } else if diff < -5.0 {
            delta += 3.0;
            factors.push("Resting HR well below baseline (indicates good recovery)".to_string());
        }
    }

    let (hrv, baseline_hrv) = (vitals.hrv_ms, baselines.hrv_ms);
    if hrv > 0.0 && baseline_hrv > 0.0 {
        let ratio = hrv / baseline_hrv;
        let percent = (ratio * 100.0).trunc();
        if ratio < 0.5 {
            delta -= 8.0;
            flag = ReadinessFlag::Alert;
            factors.push(format!(
                "HRV severely suppressed at {hrv}ms ({percent}% of baseline {baseline_hrv}ms)"
            ));
        } else if ratio < 0.7 {
            delta -= 4.0;
            flag = flag.at_least_concern();
            factors.push(format!(
                "HRV suppressed at {hrv}ms ({percent}% of baseline {baseline_hrv}ms)"
            ));
        } else if ratio > 1.1 {
            delta += 3.0;
            factors.push(format!(
                "HRV elevated at {hrv}ms (indicates parasympathetic recovery)"
            ));
        }
    }

    if vitals.breathing_rate > 20.0 {
        delta -= 3.0;
        flag = flag.at_least_concern();
        factors.push(format!(
            "Breathing rate elevated at {} breaths/min (resting expected ~{})",
            vitals.breathing_rate, baselines.breathing_rate
        ));
    }

    if vitals.confidence < 0.5 {
        flag = flag.at_least_concern();
        factors.push(format!(
            "Presage measurement confidence low ({:.2}). Recommend re-check in better lighting.",
            vitals.confidence
        ));
    }

    if factors.is_empty() {
        factors.push("All vitals within normal range. Player appears well-recovered.".to_string());
    }
    factors.truncate(MAX_FACTORS);

    HeuristicAssessment {
        readiness_delta: (delta.clamp(DELTA_MIN, DELTA_MAX) * 10.0).round() / 10.0,
        readiness_flag: flag,
        contributing_factors: factors,
    }
}

/// Output schema
#[must_use]
pub fn schema() -> FeatureSchema {
    FeatureSchema::new(FEATURE)
        .field(FieldSpec::required(
            "readiness_delta",
            FieldType::number_in(DELTA_MIN, DELTA_MAX),
        ))
        .field(FieldSpec::required(
            "readiness_flag",
            FieldType::enumeration(["GOOD", "CONCERN", "ALERT"]),
        ))
        .field(FieldSpec::required(
            "contributing_factors",
            FieldType::string_list_max(MAX_FACTORS),
        ))
        .field(FieldSpec::required("recommendation", FieldType::String))
        .field(FieldSpec::optional("emotional_state", FieldType::String))
}

/// Static fallback, used when the request carries no usable context
#[must_use]
pub fn fallback() -> Value {
    json!({
        "readiness_delta": 0.0,
        "readiness_flag": "CONCERN",
        "contributing_factors": ["Automated vitals assessment unavailable."],
        "recommendation": ReadinessFlag::Concern.recommendation()
    })
}

/// Context-derived fallback: the heuristic assessment of the request input
#[must_use]
pub fn derived_fallback(context: &Value) -> Option<Value> {
    let input: VitalsInput = serde_json::from_value(context.clone()).ok()?;
    Some(assess(&input.vitals, &input.baselines()).to_output())
}

/// Assemble the generation request; the input is kept as request context
#[must_use]
pub fn request(input: &VitalsInput) -> GenerationRequest {
    let baselines = input.baselines();
    let heuristic = assess(&input.vitals, &baselines);
    debug!(
        player = %input.player.name,
        flag = ?heuristic.readiness_flag,
        delta = heuristic.readiness_delta,
        "Heuristic readiness assessment"
    );
    let context = json!({
        "player": {
            "name": input.player.name,
            "position": input.player.position,
            "current_risk_score": input.player.risk_score,
            "current_readiness_score": input.player.readiness_score,
            "acwr": input.player.acwr,
            "last_match_minutes": input.player.last_match_minutes,
        },
        "presage_vitals": input.vitals,
        "baselines": baselines,
        "heuristic_assessment": heuristic,
    });
    let rendered = serde_json::to_string_pretty(&context).unwrap_or_else(|_| "{}".to_string());

    let mut builder = GenerationRequest::builder(FEATURE).prompt(VITALS.render(&rendered));
    if let Ok(raw) = serde_json::to_value(input) {
        builder = builder.context(raw);
    }
    builder.build()
}

/// Decode caller context and assemble the request
pub fn request_from_context(context: &Value) -> FeatureResult<GenerationRequest> {
    let input: VitalsInput = serde_json::from_value(context.clone())
        .map_err(|e| FeatureError::invalid_context(FEATURE, e))?;
    Ok(request(&input))
}
