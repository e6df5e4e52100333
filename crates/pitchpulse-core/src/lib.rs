//! # PitchPulse Core
//!
//! Core types, traits, and error handling for the PitchPulse AI gateway.
//!
//! This crate provides the foundational types used throughout the workspace:
//! - Feature names and per-feature output schemas
//! - Schema validation for model payloads
//! - Generation request and result types
//! - The upstream model trait
//! - Error types and handling

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod feature;
pub mod model;
pub mod request;
pub mod result;
pub mod schema;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use feature::FeatureName;
pub use model::{Embedder, GenerationModel, ModelCall};
pub use request::{GenerationRequest, Prompt, PromptPart, RequestId};
pub use result::{FailureReason, GenerationResult};
pub use schema::{
    render_violations, FeatureSchema, FieldSpec, FieldType, OutputRule, SchemaViolation,
    ViolationKind,
};
