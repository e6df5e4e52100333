//! Test helper utilities for integration tests

use crate::mock_gemini::MockGemini;
use pitchpulse_features::standard_catalog;
use pitchpulse_gateway::GenerationGateway;
use pitchpulse_providers::{GeminiClient, GeminiConfig, GeminiEmbedder, GeminiFiles};
use pitchpulse_resilience::{RetryPolicy, RetryPolicyBuilder};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// API key the clients send to the mock
pub const TEST_API_KEY: &str = "integration-test-key";

static TRACING: Once = Once::new();

/// Initialize tracing for tests (only once, and only with `TEST_LOG` set)
pub fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var("TEST_LOG").is_ok() {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();
        }
    });
}

/// Client configuration pointed at the mock
pub fn gemini_config(mock: &MockGemini) -> GeminiConfig {
    GeminiConfig::new(TEST_API_KEY)
        .with_base_url(mock.base_url())
        .with_timeout(Duration::from_secs(10))
}

/// Two attempts, no pause between them
pub fn test_policy(attempt_timeout: Duration) -> RetryPolicy {
    RetryPolicyBuilder::new()
        .max_attempts(2)
        .attempt_timeout(attempt_timeout)
        .jitter(Duration::ZERO)
        .build()
}

/// Gateway with every PitchPulse feature, talking to the mock
pub fn gateway(mock: &MockGemini, policy: RetryPolicy) -> GenerationGateway {
    init_tracing();
    let catalog = standard_catalog().expect("standard catalog");
    let client = GeminiClient::new(gemini_config(mock)).expect("gemini client");
    GenerationGateway::builder(catalog, Arc::new(client))
        .retry_policy(policy)
        .build()
        .expect("gateway")
}

/// Embedding client talking to the mock
pub fn embedder(mock: &MockGemini) -> GeminiEmbedder {
    GeminiEmbedder::new(gemini_config(mock)).expect("gemini embedder")
}

/// Files API client talking to the mock, polling every 10ms
pub fn files(mock: &MockGemini) -> GeminiFiles {
    GeminiFiles::new(gemini_config(mock))
        .expect("gemini files")
        .with_poll_interval(Duration::from_millis(10))
}
