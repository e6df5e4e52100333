//! # PitchPulse Gateway
//!
//! Strict-JSON structured generation for the PitchPulse AI features.
//!
//! This crate provides:
//! - [`SchemaRegistry`]: the output contract of every feature
//! - [`FallbackPolicy`]: the deterministic substitute for every feature
//! - [`GenerationCatalog`]: both of the above, validated once and frozen
//! - [`GenerationGateway`]: bounded attempts against the upstream model, each
//!   with its own timeout, ending in a conformant value or the fallback
//!
//! ```ignore
//! let catalog = CatalogBuilder::new()
//!     .feature(movement_schema(), movement_fallback())?
//!     .build()?;
//! let gateway = GenerationGateway::builder(catalog, Arc::new(gemini)).build()?;
//! let result = gateway.generate(&request).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod fallback;
pub mod gateway;
pub mod payload;
pub mod registry;
pub mod state;

// Re-export main types
pub use catalog::{CatalogBuilder, GenerationCatalog};
pub use fallback::{DerivedFallback, FallbackPolicy};
pub use gateway::{GatewayBuilder, GenerationGateway};
pub use registry::SchemaRegistry;
pub use state::{AttemptFailure, AttemptState, RetryState, Transition};
