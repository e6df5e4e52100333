//! Prompt templates.
//!
//! Templates live in `prompts/` next to the crate manifest and are compiled
//! in. User templates carry a single `{context}` placeholder.

use pitchpulse_core::Prompt;

const CONTEXT_PLACEHOLDER: &str = "{context}";

/// System instruction plus user template for one feature
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    system: &'static str,
    user: &'static str,
}

impl PromptTemplate {
    pub(crate) const fn new(system: &'static str, user: &'static str) -> Self {
        Self { system, user }
    }

    /// System instruction text
    #[must_use]
    pub fn system(&self) -> &'static str {
        self.system
    }

    /// User template text
    #[must_use]
    pub fn user(&self) -> &'static str {
        self.user
    }

    /// Substitute `context` into the user template
    #[must_use]
    pub fn render_user(&self, context: &str) -> String {
        self.user.replace(CONTEXT_PLACEHOLDER, context)
    }

    /// Build a text-only prompt with `context` substituted
    #[must_use]
    pub fn render(&self, context: &str) -> Prompt {
        Prompt::new(self.system, self.render_user(context))
    }
}

pub(crate) const ACTION_PLAN: PromptTemplate = PromptTemplate::new(
    include_str!("../prompts/action_plan_system.txt"),
    include_str!("../prompts/action_plan_user.txt"),
);

pub(crate) const MATCH_REPORT: PromptTemplate = PromptTemplate::new(
    include_str!("../prompts/match_report_system.txt"),
    include_str!("../prompts/match_report_user.txt"),
);

pub(crate) const MOVEMENT: PromptTemplate = PromptTemplate::new(
    include_str!("../prompts/movement_system.txt"),
    include_str!("../prompts/movement_user.txt"),
);

pub(crate) const VITALS: PromptTemplate = PromptTemplate::new(
    include_str!("../prompts/vitals_system.txt"),
    include_str!("../prompts/vitals_user.txt"),
);

pub(crate) const SUGGESTED_XI: PromptTemplate = PromptTemplate::new(
    include_str!("../prompts/suggested_xi_system.txt"),
    include_str!("../prompts/suggested_xi_user.txt"),
);
