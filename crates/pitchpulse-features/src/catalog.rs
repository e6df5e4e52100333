//! The PitchPulse feature set.

use crate::error::{FeatureError, FeatureResult};
use crate::{action_plan, lineup, match_report, movement, vitals};
use pitchpulse_core::{FeatureSchema, GatewayResult, GenerationRequest};
use pitchpulse_gateway::{CatalogBuilder, GenerationCatalog};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// One PitchPulse AI feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Weekly player action plan
    ActionPlan,
    /// Post-match workload report
    MatchReport,
    /// Movement-screen clip analysis
    MovementAnalysis,
    /// Camera check-in vitals fusion
    VitalsFusion,
    /// Suggested starting XI
    SuggestedXi,
}

impl Feature {
    /// Every feature, in registration order
    pub const ALL: [Self; 5] = [
        Self::ActionPlan,
        Self::MatchReport,
        Self::MovementAnalysis,
        Self::VitalsFusion,
        Self::SuggestedXi,
    ];

    /// Registered feature name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ActionPlan => action_plan::FEATURE,
            Self::MatchReport => match_report::FEATURE,
            Self::MovementAnalysis => movement::FEATURE,
            Self::VitalsFusion => vitals::FEATURE,
            Self::SuggestedXi => lineup::FEATURE,
        }
    }

    /// Output schema
    #[must_use]
    pub fn schema(self) -> FeatureSchema {
        match self {
            Self::ActionPlan => action_plan::schema(),
            Self::MatchReport => match_report::schema(),
            Self::MovementAnalysis => movement::schema(),
            Self::VitalsFusion => vitals::schema(),
            Self::SuggestedXi => lineup::schema(),
        }
    }

    /// Static fallback
    #[must_use]
    pub fn fallback(self) -> Value {
        match self {
            Self::ActionPlan => action_plan::fallback(),
            Self::MatchReport => match_report::fallback(),
            Self::MovementAnalysis => movement::fallback(),
            Self::VitalsFusion => vitals::fallback(),
            Self::SuggestedXi => lineup::fallback(),
        }
    }

    /// Decode caller context into this feature's input and assemble the
    /// request. `video_model` is used by movement analysis only.
    pub fn request_from_context(
        self,
        context: &Value,
        video_model: &str,
    ) -> FeatureResult<GenerationRequest> {
        match self {
            Self::ActionPlan => action_plan::request_from_context(context),
            Self::MatchReport => match_report::request_from_context(context),
            Self::MovementAnalysis => movement::request_from_context(context, video_model),
            Self::VitalsFusion => vitals::request_from_context(context),
            Self::SuggestedXi => lineup::request_from_context(context),
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Feature {
    type Err = FeatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.as_str() == s)
            .ok_or_else(|| FeatureError::UnknownFeature(s.to_string()))
    }
}

/// Catalog with every PitchPulse feature, its static fallback and, for
/// vitals fusion and suggested XI, the context-derived fallback
///
/// # Errors
/// Returns a catalog error if a schema or fallback is inconsistent
pub fn standard_catalog() -> GatewayResult<Arc<GenerationCatalog>> {
    let mut builder = CatalogBuilder::new();
    for feature in Feature::ALL {
        builder = builder.feature(feature.schema(), feature.fallback())?;
    }
    builder
        .derived_fallback(vitals::FEATURE, vitals::derived_fallback)?
        .derived_fallback(lineup::FEATURE, lineup::derived_fallback)?
        .build()
}
