//! Movement-screen video analysis.
//!
//! The model is grounded with a football-specific dictionary of mechanical
//! flags. Flags relevant to the player's position are listed first in the
//! system instruction; unknown positions get the whole dictionary.

use crate::error::{FeatureError, FeatureResult};
use crate::prompt::MOVEMENT;
use pitchpulse_core::{FeatureSchema, FieldSpec, FieldType, GenerationRequest, Prompt, PromptPart};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt::Write as _;

/// Feature name
pub const FEATURE: &str = "movement_analysis";

/// Multimodal model used for clips
pub const VIDEO_MODEL: &str = "gemini-2.5-pro";

/// Sampling temperature for clips
pub const VIDEO_TEMPERATURE: f32 = 0.2;

const SCREEN_CONTEXT_PLACEHOLDER: &str = "{screen_context}";

/// Risk band of a movement flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskBand {
    /// Low
    #[serde(rename = "LOW")]
    Low,
    /// Medium
    #[serde(rename = "MED")]
    Med,
    /// High
    #[serde(rename = "HIGH")]
    High,
}

/// One entry of the movement-flag dictionary
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MovementFlag {
    /// Identifier the model reports (e.g. `knee_valgus`)
    pub id: &'static str,
    /// What the pattern looks like
    pub description: &'static str,
    /// Where it shows up in football
    pub soccer_context: &'static str,
    /// Associated injuries
    pub injury_risk: &'static [&'static str],
    /// Severity
    pub risk_band: RiskBand,
    /// Positions most affected
    pub position_flags: &'static [&'static str],
    /// Corrective cues
    pub coaching_cues: &'static [&'static str],
}

impl MovementFlag {
    /// `knee_valgus` -> `Knee Valgus`
    #[must_use]
    pub fn title(&self) -> String {
        self.id
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                chars.next().map_or_else(String::new, |first| {
                    first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
                })
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// The movement-flag dictionary, in reference order
pub const MOVEMENT_FLAGS: &[MovementFlag] = &[
    MovementFlag {
        id: "knee_valgus",
        description: "Inward collapse of the knee during deceleration, landing, or squat movement.",
        soccer_context: "Common in decelerating from sprints and cutting off the dribble. Highest prevalence in fullbacks and wingers who change direction frequently.",
        injury_risk: &["ACL tear", "Medial knee ligament strain", "Patellofemoral pain"],
        risk_band: RiskBand::High,
        position_flags: &["Winger", "Fullback", "Striker"],
        coaching_cues: &[
            "Drive knees out in line with the 2nd toe on landing.",
            "Focus on glute activation drills before sprint sessions (banded walks, clamshells).",
            "Use cone guides to cue outward knee track during change-of-direction drills.",
        ],
    },
    MovementFlag {
        id: "hip_drop",
        description: "Contralateral (opposite side) hip drops during single-leg stance or lateral movement.",
        soccer_context: "Indicates weak hip abductors and glute medius. Frequently seen in players returning from hamstring or groin injury. A strong predictor of future adductor or IT band issues.",
        injury_risk: &["IT band syndrome", "Adductor strain", "Lumbar overload"],
        risk_band: RiskBand::Med,
        position_flags: &["All positions"],
        coaching_cues: &[
            "Prescribe single-leg glute bridge and lateral band walks.",
            "Monitor during full-pace cutting drills in training.",
            "Tape can be used to increase proprioceptive feedback at the hip during rehab.",
        ],
    },
    MovementFlag {
        id: "forward_trunk_lean",
        description: "Excessive forward lean of the trunk during deceleration or squat movements.",
        soccer_context: "Indicates tight hip flexors and/or weak glutes/hamstrings. Common in players with high high-speed running (HSR) volumes (wingers, strikers) and those returning from international duty.",
        injury_risk: &["Lumbar strain", "Hamstring overload", "Patellar tendinopathy"],
        risk_band: RiskBand::Med,
        position_flags: &["Winger", "Striker", "Central Midfielder"],
        coaching_cues: &[
            "Hip flexor mobility work (kneeling lunge stretch) prescribed daily.",
            "Cue upright chest position during deceleration mechanics practice.",
            "Incorporate Romanian Deadlift (RDL) to strengthen posterior chain.",
        ],
    },
    MovementFlag {
        id: "asymmetry_lateral",
        description: "Player exhibits measurably different movement quality or range of motion on left vs right side.",
        soccer_context: "Lateral asymmetry is one of the most reliable pre-injury indicators in soccer. Players who favour their dominant foot often develop asymmetric loading patterns that overload the weaker side over a season.",
        injury_risk: &["Groin strain (weaker side)", "Hamstring strain", "Ankle sprain"],
        risk_band: RiskBand::High,
        position_flags: &["All positions"],
        coaching_cues: &[
            "Implement unilateral loading (single-leg press, Bulgarian split squat) with extra focus on weaker side.",
            "Use jump-landing assessment to quantify symmetry (force plate if available).",
            "Reduce asymmetric loads until <15% deficit is achieved.",
        ],
    },
    MovementFlag {
        id: "ankle_pronation_excessive",
        description: "Excessive inward roll of the ankle during stance or landing phase.",
        soccer_context: "Frequent in players on hard artificial surfaces. Often precedes lateral ankle sprains, particularly during reactive agility and in-game tackle situations.",
        injury_risk: &["Lateral ankle sprain", "Plantar fasciitis", "Achilles tendinopathy"],
        risk_band: RiskBand::Med,
        position_flags: &["Fullback", "Winger", "Goalkeeper"],
        coaching_cues: &[
            "Assess boot/cleat fit and insole support.",
            "Foot strengthening programme (toe curls, single-leg balance with perturbation).",
            "Monitor on artificial turf surfaces specifically.",
        ],
    },
    MovementFlag {
        id: "pelvic_tilt_anterior",
        description: "Anterior pelvic tilt (lumbar arch increased) observed during standing or movement patterns.",
        soccer_context: "Common consequence of prolonged sitting combined with high sprinting loads. Indicates hip flexor dominance and glute inhibition, a risk pattern for groin and hip flexor strains.",
        injury_risk: &["Hip flexor strain", "Groin strain", "Lumbar disc stress"],
        risk_band: RiskBand::Med,
        position_flags: &["All positions"],
        coaching_cues: &[
            "Daily hip flexor stretching (couch stretch, 90/90 hip stretch) mandatory.",
            "Core activation drills focused on posterior pelvic tilt under load.",
            "Limit seated time between training sessions.",
        ],
    },
    MovementFlag {
        id: "limited_dorsiflexion",
        description: "Reduced ankle dorsiflexion range of motion during squat or movement screen.",
        soccer_context: "Tight Achilles/gastroc-soleus complex. A key predictor of Achilles tendinopathy and plantar fasciitis in players with high acceleration/deceleration demands.",
        injury_risk: &["Achilles tendinopathy", "Plantar fasciitis", "Calf strain"],
        risk_band: RiskBand::High,
        position_flags: &["Striker", "Winger", "Fullback"],
        coaching_cues: &[
            "Calf raises on a step (both eccentric and concentric) prescribed.",
            "Ankle mobility work (half-kneeling ankle rock) before each training session.",
            "Monitor Achilles tightness post-sprint training.",
        ],
    },
    MovementFlag {
        id: "head_forward_posture",
        description: "Head positioned significantly forward of the shoulder line during movement.",
        soccer_context: "Less directly linked to lower limb injury but indicates upper thoracic tightness that can affect sprint mechanics and increase risk in aerial duel situations.",
        injury_risk: &["Cervical strain (heading duels)", "Upper trapezius overload"],
        risk_band: RiskBand::Low,
        position_flags: &["Centre-Back", "Striker"],
        coaching_cues: &[
            "Thoracic mobility work (foam roller extensions, cat-camel).",
            "Chin tuck exercises to restore neutral head position.",
            "Assess heading technique with coaching staff during next session.",
        ],
    },
    MovementFlag {
        id: "knee_hyperextension",
        description: "Knee moves into hyperextension (beyond neutral) on landing or single-leg stance.",
        soccer_context: "Significant ACL risk indicator. Often seen in players with hypermobility or following incomplete neuromuscular rehabilitation from prior knee injury.",
        injury_risk: &["ACL injury", "Posterior knee capsule strain"],
        risk_band: RiskBand::High,
        position_flags: &["All positions"],
        coaching_cues: &[
            "Mandatory neuromuscular knee stability programme (Nordic curls, single-leg squats).",
            "Cue 'soft knees' in all landing mechanics practice.",
            "Refer to physio for comprehensive knee stability screen immediately.",
        ],
    },
    MovementFlag {
        id: "trunk_rotation_asymmetry",
        description: "Asymmetric trunk rotation during movement, with one side rotating significantly more.",
        soccer_context: "Common in players who heavily favour one-footed movements (e.g. driving crosses or shooting predominantly off one leg). Can lead to oblique and lumbar overload over time.",
        injury_risk: &["Oblique strain", "Lumbar rotation stress fracture risk"],
        risk_band: RiskBand::Med,
        position_flags: &["Winger", "Fullback", "Central Midfielder"],
        coaching_cues: &[
            "Incorporate bilateral movement patterns into technical training.",
            "Prescribe thoracic rotation mobility (seated rotation stretch).",
            "Monitor lumbar region during and after high-rotation match weeks.",
        ],
    },
];

/// Flag identifiers to check first, per position
pub const POSITION_FLAG_PRIORITY: &[(&str, &[&str])] = &[
    (
        "Winger",
        &[
            "knee_valgus",
            "asymmetry_lateral",
            "forward_trunk_lean",
            "ankle_pronation_excessive",
            "trunk_rotation_asymmetry",
        ],
    ),
    (
        "Fullback",
        &["knee_valgus", "ankle_pronation_excessive", "hip_drop", "limited_dorsiflexion"],
    ),
    (
        "Striker",
        &["knee_valgus", "forward_trunk_lean", "pelvic_tilt_anterior", "limited_dorsiflexion"],
    ),
    (
        "Central Midfielder",
        &["forward_trunk_lean", "hip_drop", "trunk_rotation_asymmetry", "pelvic_tilt_anterior"],
    ),
    (
        "Defensive Midfielder",
        &["hip_drop", "pelvic_tilt_anterior", "knee_hyperextension"],
    ),
    (
        "Centre-Back",
        &["hip_drop", "head_forward_posture", "knee_valgus", "asymmetry_lateral"],
    ),
    (
        "Goalkeeper",
        &["ankle_pronation_excessive", "knee_hyperextension", "asymmetry_lateral"],
    ),
];

/// Look up a flag by identifier
#[must_use]
pub fn flag(id: &str) -> Option<&'static MovementFlag> {
    MOVEMENT_FLAGS.iter().find(|flag| flag.id == id)
}

/// Flags to prioritise for a position; every flag for unknown positions
#[must_use]
pub fn flags_for_position(position: &str) -> Vec<&'static MovementFlag> {
    POSITION_FLAG_PRIORITY
        .iter()
        .find(|(name, _)| *name == position)
        .map_or_else(
            || MOVEMENT_FLAGS.iter().collect(),
            |(_, ids)| ids.iter().filter_map(|id| flag(id)).collect(),
        )
}

/// Position-focused flag reference injected into the system instruction
#[must_use]
pub fn screen_context(position: &str) -> String {
    let mut context =
        format!("For a {position}, prioritize checking for the following mechanical risks:\n\n");
    for flag in flags_for_position(position) {
        let _ = writeln!(context, "- **{}**: {}", flag.title(), flag.description);
        let _ = writeln!(context, "  Injury risks: {}", flag.injury_risk.join(", "));
        let _ = writeln!(context, "  Cues: {}\n", flag.coaching_cues.join("; "));
    }
    context
}

fn default_position() -> String {
    "player".to_string()
}

fn default_mime_type() -> String {
    "video/mp4".to_string()
}

/// Input of the movement analysis feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementInput {
    /// Playing position (e.g. `Winger`)
    #[serde(default = "default_position")]
    pub position: String,
    /// Provider URI of the already-uploaded clip
    pub clip_uri: String,
    /// Clip MIME type
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

impl MovementInput {
    /// Input for a clip in the default MIME type
    #[must_use]
    pub fn new(position: impl Into<String>, clip_uri: impl Into<String>) -> Self {
        Self {
            position: position.into(),
            clip_uri: clip_uri.into(),
            mime_type: default_mime_type(),
        }
    }
}

/// MIME type of a clip from its file extension; `video/mp4` when unknown
#[must_use]
pub fn clip_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mpeg" | "mpg") => "video/mpeg",
        Some("3gp") => "video/3gpp",
        _ => "video/mp4",
    }
}

/// Point caller context at an uploaded clip. Other keys are kept; a context
/// that is not an object is replaced.
#[must_use]
pub fn with_uploaded_clip(context: Value, uri: &str, mime_type: &str) -> Value {
    let mut object = match context {
        Value::Object(object) => object,
        _ => Map::new(),
    };
    object.insert("clip_uri".to_string(), Value::from(uri));
    object.insert("mime_type".to_string(), Value::from(mime_type));
    Value::Object(object)
}

/// Output schema
#[must_use]
pub fn schema() -> FeatureSchema {
    FeatureSchema::new(FEATURE)
        .field(FieldSpec::required(
            "mechanical_risk_band",
            FieldType::enumeration(["LOW", "MED", "HIGH"]),
        ))
        .field(FieldSpec::required("flags", FieldType::string_list()))
        .field(FieldSpec::required("coaching_cues", FieldType::string_list()))
        .field(FieldSpec::required("confidence", FieldType::number_in(0.0, 1.0)))
}

/// Static fallback
#[must_use]
pub fn fallback() -> Value {
    json!({
        "mechanical_risk_band": "MED",
        "confidence": 0.0,
        "flags": [],
        "coaching_cues": []
    })
}

/// Build the multimodal prompt: clip first, then the instruction
#[must_use]
pub fn prompt(input: &MovementInput) -> Prompt {
    let system = MOVEMENT
        .system()
        .replace(SCREEN_CONTEXT_PLACEHOLDER, &screen_context(&input.position));
    Prompt {
        system: Some(system),
        parts: vec![
            PromptPart::file(input.mime_type.as_str(), input.clip_uri.as_str()),
            PromptPart::text(MOVEMENT.user()),
        ],
    }
}

/// Assemble the generation request for the default video model
#[must_use]
pub fn request(input: &MovementInput) -> GenerationRequest {
    request_with_model(input, VIDEO_MODEL)
}

/// Assemble the generation request for a specific model
#[must_use]
pub fn request_with_model(input: &MovementInput, model: &str) -> GenerationRequest {
    GenerationRequest::builder(FEATURE)
        .prompt(prompt(input))
        .model(model)
        .temperature(VIDEO_TEMPERATURE)
        .build()
}

/// Decode caller context and assemble the request
pub fn request_from_context(context: &Value, model: &str) -> FeatureResult<GenerationRequest> {
    let input: MovementInput = serde_json::from_value(context.clone())
        .map_err(|e| FeatureError::invalid_context(FEATURE, e))?;
    Ok(request_with_model(&input, model))
}
