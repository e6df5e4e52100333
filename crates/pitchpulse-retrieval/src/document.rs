//! Canonical document text.
//!
//! The same rendering is used when a player-week is ingested and when it is
//! used as a query, so both sides embed identically structured text.

use serde::{Deserialize, Serialize};

/// One player-week of workload metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerWeek {
    /// Display name
    pub player_name: String,
    /// Week start (ISO date or label)
    pub week_start: String,
    /// Injury risk score
    pub risk_score: f64,
    /// Readiness score
    pub readiness: f64,
    /// Acute:chronic workload ratio
    pub acwr: f64,
    /// Training monotony
    pub monotony: f64,
    /// Training strain
    pub strain: f64,
    /// Minutes in the last match
    pub last_match_minutes: f64,
    /// Risk drivers
    #[serde(default)]
    pub drivers: Vec<String>,
    /// Recommended action
    pub recommended_action: String,
}

/// Render a player-week
#[must_use]
pub fn player_week_document(week: &PlayerWeek) -> String {
    let drivers = if week.drivers.is_empty() {
        "None".to_string()
    } else {
        week.drivers.join(", ")
    };
    format!(
        "Player {} week {}. risk {} readiness {}. ACWR {}. monotony {}. strain {}. \
         last_match_minutes {}. drivers: {drivers}. recommended: {}.",
        week.player_name,
        week.week_start,
        week.risk_score,
        week.readiness,
        week.acwr,
        week.monotony,
        week.strain,
        week.last_match_minutes,
        week.recommended_action
    )
    .trim()
    .to_string()
}
