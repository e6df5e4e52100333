//! Prometheus metrics for structured generation.
//!
//! Each [`GenerationMetrics`] owns a private registry.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::fmt;
use std::time::Duration;

/// Outcome label of one upstream attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptOutcome {
    /// Payload validated
    Conformant,
    /// Attempt timed out
    Timeout,
    /// Upstream call failed
    CallError,
    /// Payload was not JSON
    MalformedPayload,
    /// Payload broke the schema
    SchemaValidation,
}

impl AttemptOutcome {
    /// Label value
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conformant => "conformant",
            Self::Timeout => "timeout",
            Self::CallError => "call_error",
            Self::MalformedPayload => "malformed_payload",
            Self::SchemaValidation => "schema_validation",
        }
    }
}

/// Generation metrics
#[derive(Clone)]
pub struct GenerationMetrics {
    registry: Registry,
    attempts_total: IntCounterVec,
    results_total: IntCounterVec,
    attempt_duration: HistogramVec,
}

impl GenerationMetrics {
    /// Create and register the metric families
    ///
    /// # Errors
    /// Returns error if a metric cannot be created or registered
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let attempts_total = IntCounterVec::new(
            Opts::new(
                "pitchpulse_generation_attempts_total",
                "Upstream generation attempts by outcome",
            ),
            &["feature", "outcome"],
        )?;

        let results_total = IntCounterVec::new(
            Opts::new(
                "pitchpulse_generation_results_total",
                "Generation results returned to callers",
            ),
            &["feature", "result"],
        )?;

        let attempt_duration = HistogramVec::new(
            HistogramOpts::new(
                "pitchpulse_generation_attempt_duration_seconds",
                "Duration of one upstream generation attempt",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 4.0, 8.0, 16.0]),
            &["feature"],
        )?;

        registry.register(Box::new(attempts_total.clone()))?;
        registry.register(Box::new(results_total.clone()))?;
        registry.register(Box::new(attempt_duration.clone()))?;

        Ok(Self {
            registry,
            attempts_total,
            results_total,
            attempt_duration,
        })
    }

    /// Record one finished attempt
    pub fn record_attempt(&self, feature: &str, outcome: AttemptOutcome, elapsed: Duration) {
        self.attempts_total
            .with_label_values(&[feature, outcome.as_str()])
            .inc();
        self.attempt_duration
            .with_label_values(&[feature])
            .observe(elapsed.as_secs_f64());
    }

    /// Record a result handed back to the caller (`conformant` or `fallback`)
    pub fn record_result(&self, feature: &str, result: &str) {
        self.results_total
            .with_label_values(&[feature, result])
            .inc();
    }

    /// Current attempt count for a label pair
    #[must_use]
    pub fn attempt_count(&self, feature: &str, outcome: AttemptOutcome) -> u64 {
        self.attempts_total
            .with_label_values(&[feature, outcome.as_str()])
            .get()
    }

    /// Current result count for a label pair
    #[must_use]
    pub fn result_count(&self, feature: &str, result: &str) -> u64 {
        self.results_total
            .with_label_values(&[feature, result])
            .get()
    }

    /// Registry holding the metric families
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render all metrics in the Prometheus text exposition format
    ///
    /// # Errors
    /// Returns error if encoding fails
    pub fn gather_text(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl fmt::Debug for GenerationMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationMetrics").finish_non_exhaustive()
    }
}
