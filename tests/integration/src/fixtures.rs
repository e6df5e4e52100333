//! Request contexts and model outputs shared by the integration tests

use serde_json::{json, Value};

/// Model used for text features
pub const TEXT_MODEL: &str = "gemini-2.5-flash";

/// Model used for movement analysis
pub const VIDEO_MODEL: &str = "gemini-2.5-pro";

/// Embedding model
pub const EMBEDDING_MODEL: &str = "gemini-embedding-001";

/// Movement-screen clip of a winger
pub fn movement_context() -> Value {
    json!({
        "position": "Winger",
        "clip_uri": "https://generativelanguage.googleapis.com/v1beta/files/abc123",
        "mime_type": "video/mp4"
    })
}

/// Conformant movement analysis
pub fn movement_output() -> Value {
    json!({
        "mechanical_risk_band": "HIGH",
        "flags": ["knee_valgus", "asymmetry_lateral"],
        "coaching_cues": ["Drive knees out in line with the 2nd toe on landing."],
        "confidence": 0.82
    })
}

/// Movement analysis missing its confidence
pub fn movement_output_without_confidence() -> Value {
    json!({
        "mechanical_risk_band": "HIGH",
        "flags": ["knee_valgus"],
        "coaching_cues": []
    })
}

/// Check-in of a player with elevated pulse and suppressed HRV
pub fn vitals_context() -> Value {
    json!({
        "player": {
            "name": "Marcus Rashford",
            "position": "Winger",
            "risk_score": 68,
            "readiness_score": 55,
            "acwr": 1.45,
            "last_match_minutes": 90
        },
        "vitals": {
            "pulse_rate": 90,
            "hrv_ms": 30,
            "breathing_rate": 16,
            "confidence": 0.9
        }
    })
}

/// Post-match context
pub fn match_report_context() -> Value {
    json!({
        "fixture": {"opponent": "Arsenal", "score": "2-1", "competition": "Premier League"},
        "team_performance": {"total_distance_km": 112.4, "sprints": 168},
        "player_loads": [
            {"name": "Bukayo", "minutes": 90, "hsr_m": 1120, "flag": "HIGH"},
            {"name": "Declan", "minutes": 78, "hsr_m": 640, "flag": "NORMAL"}
        ]
    })
}

/// Conformant match report
pub fn match_report_output() -> Value {
    json!({
        "match_summary": "Narrow win built on high pressing intensity.",
        "squad_load_assessment": "Two wide players exceeded their high-speed running thresholds.",
        "critical_flags": ["Bukayo HSR 40% above rolling average"],
        "recommendations": ["Recovery session for starters within 48 hours"]
    })
}

fn squad_player(id: &str, position: &str, readiness: u32) -> Value {
    json!({
        "id": id,
        "name": format!("Player {id}"),
        "position": position,
        "readiness": readiness,
        "risk": 100 - readiness
    })
}

/// Lineup context with a full squad
pub fn lineup_context() -> Value {
    let mut squad = vec![squad_player("gk1", "GK", 92), squad_player("gk2", "GK", 70)];
    for (i, readiness) in [88, 81, 77, 73, 64].into_iter().enumerate() {
        squad.push(squad_player(&format!("d{i}"), "DEF", readiness));
    }
    for (i, readiness) in [90, 84, 79, 60].into_iter().enumerate() {
        squad.push(squad_player(&format!("m{i}"), "MID", readiness));
    }
    for (i, readiness) in [86, 83, 75, 58].into_iter().enumerate() {
        squad.push(squad_player(&format!("f{i}"), "FW", readiness));
    }
    json!({
        "opponent": "Bayern Munich",
        "match_context": "Away, Champions League Semi-Final",
        "available_squad": squad
    })
}
