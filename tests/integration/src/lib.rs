//! Integration tests for the PitchPulse AI gateway
//!
//! Every test runs the real Gemini clients against a wiremock server:
//! - Movement analysis end to end (conformant, timeout, repair by retry)
//! - Context-derived fallbacks for vitals fusion and suggested XI
//! - Knowledge-base seeding and search over the embedding endpoint

pub mod fixtures;
pub mod helpers;
pub mod mock_gemini;

// Re-export commonly used items
pub use fixtures::*;
pub use helpers::*;
pub use mock_gemini::*;

#[cfg(test)]
mod feature_tests;
#[cfg(test)]
mod movement_tests;
#[cfg(test)]
mod retrieval_tests;
