//! # PitchPulse Features
//!
//! The five AI-assisted PitchPulse features, each with its output schema,
//! static fallback and prompt assembly:
//!
//! - [`action_plan`]: weekly plan grounded in similar cases and the club playbook
//! - [`match_report`]: post-match squad workload report
//! - [`movement`]: movement-screen clip analysis with a football flag dictionary
//! - [`vitals`]: camera check-in fusion backed by a rule-based assessment
//! - [`lineup`]: suggested starting XI with a readiness-ranked fallback
//!
//! [`standard_catalog`] registers all of them with the gateway.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod action_plan;
pub mod catalog;
pub mod error;
pub mod lineup;
pub mod match_report;
pub mod movement;
pub mod prompt;
pub mod vitals;

// Re-export main types
pub use action_plan::{compose_rag_context, ActionPlanInput, HistoricalCase, PlaybookSnippet};
pub use catalog::{standard_catalog, Feature};
pub use error::{FeatureError, FeatureResult};
pub use lineup::{SquadPlayer, SuggestedXiInput};
pub use match_report::MatchReportInput;
pub use movement::{MovementFlag, MovementInput, RiskBand};
pub use prompt::PromptTemplate;
pub use vitals::{Baselines, HeuristicAssessment, PlayerSnapshot, ReadinessFlag, Vitals, VitalsInput};
