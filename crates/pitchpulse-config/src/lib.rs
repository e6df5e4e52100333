//! # PitchPulse Config
//!
//! Configuration for the PitchPulse AI gateway.
//!
//! Configuration is read once at startup from a YAML or TOML file, patched
//! with environment overrides, validated, and then passed around by
//! reference. Nothing reloads it at runtime.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod loader;

pub use config::{
    BulkheadSection, GatewayConfig, GenerationSection, LoggingSection, ModelSection,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
