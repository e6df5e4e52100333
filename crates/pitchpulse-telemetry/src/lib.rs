//! # PitchPulse Telemetry
//!
//! Observability for the PitchPulse AI gateway.
//!
//! This crate provides:
//! - Structured logging setup (`tracing` + `tracing-subscriber`)
//! - Prometheus metrics for generation attempts and results

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod logging;
pub mod metrics;

// Re-export main types
pub use logging::{init_logging, LoggingConfig, TracingError};
pub use metrics::{AttemptOutcome, GenerationMetrics};
