//! Generation gateway.
//!
//! Wraps the upstream model with bounded attempts. Each attempt holds a
//! bulkhead slot, runs under its own timeout, and its output is parsed and
//! checked against the feature schema. The caller always receives either a
//! conformant value or the feature's fallback; upstream failures never
//! surface as errors.

use crate::catalog::GenerationCatalog;
use crate::payload::parse_payload;
use crate::state::{AttemptFailure, RetryState, Transition};
use pitchpulse_core::{
    FeatureSchema, GatewayError, GatewayResult, GenerationModel, GenerationRequest,
    GenerationResult, ModelCall,
};
use pitchpulse_resilience::{Bulkhead, RetryPolicy};
use pitchpulse_telemetry::{AttemptOutcome, GenerationMetrics};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Builder for [`GenerationGateway`]
#[must_use]
pub struct GatewayBuilder {
    catalog: Arc<GenerationCatalog>,
    model: Arc<dyn GenerationModel>,
    retry: RetryPolicy,
    bulkhead: Option<Arc<Bulkhead>>,
    metrics: Option<GenerationMetrics>,
}

impl GatewayBuilder {
    /// Attempt budget, per-attempt timeout and jitter
    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Concurrency limit shared by every call through this gateway
    pub fn bulkhead(mut self, bulkhead: Arc<Bulkhead>) -> Self {
        self.bulkhead = Some(bulkhead);
        self
    }

    /// Metrics sink
    pub fn metrics(mut self, metrics: GenerationMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the gateway
    ///
    /// # Errors
    /// Returns an internal error if the default metrics cannot be registered
    pub fn build(self) -> GatewayResult<GenerationGateway> {
        let metrics = match self.metrics {
            Some(metrics) => metrics,
            None => GenerationMetrics::new()
                .map_err(|e| GatewayError::internal(format!("Failed to register metrics: {e}")))?,
        };
        let bulkhead = self
            .bulkhead
            .unwrap_or_else(|| Arc::new(Bulkhead::with_defaults(self.model.id())));

        info!(
            model = self.model.id(),
            features = self.catalog.features().len(),
            max_attempts = self.retry.max_attempts(),
            attempt_timeout_ms = self.retry.attempt_timeout().as_millis(),
            "Generation gateway ready"
        );

        Ok(GenerationGateway {
            catalog: self.catalog,
            model: self.model,
            retry: self.retry,
            bulkhead,
            metrics,
        })
    }
}

/// Strict-JSON generation with bounded attempts and deterministic fallback.
///
/// Cheap to share behind an `Arc`; calls are independent and carry no
/// state between each other.
pub struct GenerationGateway {
    catalog: Arc<GenerationCatalog>,
    model: Arc<dyn GenerationModel>,
    retry: RetryPolicy,
    bulkhead: Arc<Bulkhead>,
    metrics: GenerationMetrics,
}

impl GenerationGateway {
    /// Create a builder
    pub fn builder(catalog: Arc<GenerationCatalog>, model: Arc<dyn GenerationModel>) -> GatewayBuilder {
        GatewayBuilder {
            catalog,
            model,
            retry: RetryPolicy::default(),
            bulkhead: None,
            metrics: None,
        }
    }

    /// Produce a schema-conformant value for the request.
    ///
    /// Issues at most `max_attempts` upstream calls. When none of them
    /// yields a conformant value, returns the feature's fallback tagged with
    /// the reason of the last failure.
    ///
    /// # Errors
    /// Returns `UnknownFeature` if the request names an unregistered
    /// feature; no upstream call is made in that case
    #[instrument(skip_all, fields(request_id = %request.id(), feature = %request.feature()))]
    pub async fn generate(&self, request: &GenerationRequest) -> GatewayResult<GenerationResult> {
        let feature = request.feature().as_str();
        let schema = self.catalog.schema(feature)?;

        let mut state = RetryState::new(self.retry.max_attempts());
        let mut attempt = state.begin();

        loop {
            let started = Instant::now();
            let outcome = self.attempt(request, schema).await;
            let elapsed = started.elapsed();

            let failure = match outcome {
                Ok(value) => {
                    state.succeed();
                    self.metrics
                        .record_attempt(feature, AttemptOutcome::Conformant, elapsed);
                    self.metrics.record_result(feature, "conformant");
                    info!(
                        attempt,
                        elapsed_ms = elapsed.as_millis(),
                        "Conformant output produced"
                    );
                    return Ok(GenerationResult::conformant(value));
                }
                Err(failure) => failure,
            };

            self.metrics
                .record_attempt(feature, attempt_outcome(&failure), elapsed);
            warn!(
                attempt,
                max_attempts = state.max_attempts(),
                reason = failure.reason().as_str(),
                error = %failure,
                "Generation attempt failed"
            );

            match state.fail(failure) {
                Transition::Retry(next) => {
                    attempt = next;
                    let delay = self.retry.jitter_delay();
                    if !delay.is_zero() {
                        debug!(delay_ms = delay.as_millis(), "Waiting before next attempt");
                        tokio::time::sleep(delay).await;
                    }
                }
                Transition::Exhausted(reason) => {
                    let value = self.catalog.fallback_for_request(request)?;
                    self.metrics.record_result(feature, "fallback");
                    warn!(
                        attempts = state.attempt(),
                        reason = reason.as_str(),
                        total_ms = state.elapsed().as_millis(),
                        "Attempts exhausted, returning fallback"
                    );
                    return Ok(GenerationResult::fallback(value, reason));
                }
            }
        }
    }

    /// Like [`generate`](Self::generate), but abandons the call when `cancel`
    /// fires. An in-flight upstream call is dropped and its bulkhead slot
    /// released.
    ///
    /// # Errors
    /// Returns `Cancelled` if the token fires first, otherwise as `generate`
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> GatewayResult<GenerationResult> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(request_id = %request.id(), "Generation cancelled by caller");
                Err(GatewayError::Cancelled)
            }
            result = self.generate(request) => result,
        }
    }

    /// The catalog served by this gateway
    #[must_use]
    pub fn catalog(&self) -> &Arc<GenerationCatalog> {
        &self.catalog
    }

    /// Attempt and result counters
    #[must_use]
    pub fn metrics(&self) -> &GenerationMetrics {
        &self.metrics
    }

    /// Attempt budget
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn attempt(
        &self,
        request: &GenerationRequest,
        schema: &FeatureSchema,
    ) -> Result<Value, AttemptFailure> {
        let call = ModelCall {
            request_id: request.id(),
            feature: request.feature(),
            prompt: request.prompt(),
            response_schema: self.catalog.response_schema(request.feature().as_str()),
            model: request.model(),
            temperature: request.temperature(),
        };

        let upstream = async {
            let _permit = self.bulkhead.acquire().await?;
            self.model.generate(call).await
        };

        let raw = match tokio::time::timeout(self.retry.attempt_timeout(), upstream).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(AttemptFailure::from_call_error(&e)),
            Err(_) => return Err(AttemptFailure::Timeout),
        };

        let value = parse_payload(&raw)?;
        schema
            .validate_output(&value)
            .map_err(AttemptFailure::SchemaValidation)?;
        Ok(value)
    }
}

impl fmt::Debug for GenerationGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationGateway")
            .field("model", &self.model.id())
            .field("features", &self.catalog.features())
            .field("retry", &self.retry)
            .field("bulkhead", &self.bulkhead.stats())
            .finish_non_exhaustive()
    }
}

fn attempt_outcome(failure: &AttemptFailure) -> AttemptOutcome {
    match failure {
        AttemptFailure::Timeout => AttemptOutcome::Timeout,
        AttemptFailure::Call(_) => AttemptOutcome::CallError,
        AttemptFailure::MalformedPayload(_) => AttemptOutcome::MalformedPayload,
        AttemptFailure::SchemaValidation(_) => AttemptOutcome::SchemaValidation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pitchpulse_core::{FailureReason, FieldSpec, FieldType, Prompt};
    use pitchpulse_resilience::{BulkheadConfig, RetryPolicyBuilder};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    enum Script {
        Reply(String),
        Fail,
        Hang,
    }

    struct ScriptedModel {
        script: Mutex<VecDeque<Script>>,
        repeat: Script,
        calls: Arc<AtomicU32>,
        temperatures: Mutex<Vec<Option<f32>>>,
    }

    impl ScriptedModel {
        fn new(script: Vec<Script>, repeat: Script) -> Self {
            Self {
                script: Mutex::new(script.into()),
                repeat,
                calls: Arc::new(AtomicU32::new(0)),
                temperatures: Mutex::new(Vec::new()),
            }
        }

        fn always(script: Script) -> Self {
            Self::new(Vec::new(), script)
        }
    }

    #[async_trait]
    impl GenerationModel for ScriptedModel {
        fn id(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, call: ModelCall<'_>) -> Result<String, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.temperatures.lock().push(call.temperature);
            let step = self
                .script
                .lock()
                .pop_front()
                .unwrap_or_else(|| self.repeat.clone());
            match step {
                Script::Reply(text) => Ok(text),
                Script::Fail => Err(GatewayError::provider("scripted", "unavailable", Some(503), true)),
                Script::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(String::new())
                }
            }
        }
    }

    /// Answers with the feature name so concurrent calls can be told apart
    struct EchoModel;

    #[async_trait]
    impl GenerationModel for EchoModel {
        fn id(&self) -> &str {
            "echo"
        }

        async fn generate(&self, call: ModelCall<'_>) -> Result<String, GatewayError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let text = match call.feature.as_str() {
                "movement_analysis" => json!({
                    "mechanical_risk_band": "LOW",
                    "confidence": 0.9,
                    "flags": [],
                    "coaching_cues": []
                }),
                _ => json!({"match_summary": "Composed display", "critical_flags": []}),
            };
            Ok(text.to_string())
        }
    }

    fn movement_fallback() -> Value {
        json!({"mechanical_risk_band": "MED", "confidence": 0.0, "flags": [], "coaching_cues": []})
    }

    fn catalog() -> Arc<GenerationCatalog> {
        CatalogBuilder::new()
            .feature(
                FeatureSchema::new("movement_analysis")
                    .field(FieldSpec::required(
                        "mechanical_risk_band",
                        FieldType::enumeration(["LOW", "MED", "HIGH"]),
                    ))
                    .field(FieldSpec::required("confidence", FieldType::number_in(0.0, 1.0)))
                    .field(FieldSpec::required("flags", FieldType::string_list()))
                    .field(FieldSpec::required("coaching_cues", FieldType::string_list())),
                movement_fallback(),
            )
            .unwrap()
            .feature(
                FeatureSchema::new("match_report")
                    .field(FieldSpec::required("match_summary", FieldType::String))
                    .field(FieldSpec::required("critical_flags", FieldType::string_list())),
                json!({"match_summary": "Report unavailable", "critical_flags": []}),
            )
            .unwrap()
            .derived_fallback("match_report", |context| {
                let opponent = context.get("opponent")?.as_str()?;
                Some(json!({
                    "match_summary": format!("Report against {opponent} unavailable"),
                    "critical_flags": []
                }))
            })
            .unwrap()
            .build()
            .unwrap()
    }

    fn gateway(model: Arc<dyn GenerationModel>, attempt_timeout: Duration) -> GenerationGateway {
        GenerationGateway::builder(catalog(), model)
            .retry_policy(
                RetryPolicyBuilder::new()
                    .max_attempts(2)
                    .attempt_timeout(attempt_timeout)
                    .jitter(Duration::ZERO)
                    .build(),
            )
            .build()
            .unwrap()
    }

    fn movement_request() -> GenerationRequest {
        GenerationRequest::builder("movement_analysis")
            .prompt(Prompt::new("You are a movement analyst.", "Analyse the sprint clip."))
            .build()
    }

    const VALID_MOVEMENT: &str = r#"{"mechanical_risk_band":"LOW","confidence":0.82,"flags":["knee_valgus"],"coaching_cues":["Knees over toes"]}"#;
    const MISSING_CONFIDENCE: &str =
        r#"{"mechanical_risk_band":"LOW","flags":[],"coaching_cues":[]}"#;

    #[tokio::test]
    async fn test_conformant_first_attempt_makes_one_call() {
        let model = Arc::new(ScriptedModel::always(Script::Reply(VALID_MOVEMENT.to_string())));
        let calls = Arc::clone(&model.calls);
        let gateway = gateway(model, Duration::from_secs(8));

        let result = gateway.generate(&movement_request()).await.unwrap();

        assert!(result.is_conformant());
        assert_eq!(result.value()["confidence"], 0.82);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            gateway
                .metrics()
                .attempt_count("movement_analysis", AttemptOutcome::Conformant),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_exhaust_budget_and_fall_back() {
        let model = Arc::new(ScriptedModel::always(Script::Hang));
        let calls = Arc::clone(&model.calls);
        let gateway = gateway(model, Duration::from_millis(100));

        let result = gateway.generate(&movement_request()).await.unwrap();

        assert_eq!(result.fallback_reason(), Some(FailureReason::Timeout));
        assert_eq!(result.value(), &movement_fallback());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(gateway.metrics().result_count("movement_analysis", "fallback"), 1);
    }

    #[tokio::test]
    async fn test_schema_violation_then_success() {
        let model = Arc::new(ScriptedModel::new(
            vec![Script::Reply(MISSING_CONFIDENCE.to_string())],
            Script::Reply(VALID_MOVEMENT.to_string()),
        ));
        let calls = Arc::clone(&model.calls);
        let gateway = gateway(model, Duration::from_secs(8));

        let result = gateway.generate(&movement_request()).await.unwrap();

        assert!(result.is_conformant());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            gateway
                .metrics()
                .attempt_count("movement_analysis", AttemptOutcome::SchemaValidation),
            1
        );
    }

    #[tokio::test]
    async fn test_persistent_violation_reports_schema_reason() {
        let model = Arc::new(ScriptedModel::always(Script::Reply(
            MISSING_CONFIDENCE.to_string(),
        )));
        let calls = Arc::clone(&model.calls);
        let gateway = gateway(model, Duration::from_secs(8));

        let result = gateway.generate(&movement_request()).await.unwrap();

        assert_eq!(result.fallback_reason(), Some(FailureReason::SchemaValidation));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_last_failure_decides_reason() {
        let model = Arc::new(ScriptedModel::new(
            vec![Script::Reply("not json".to_string())],
            Script::Fail,
        ));
        let gateway = gateway(model, Duration::from_secs(8));

        let result = gateway.generate(&movement_request()).await.unwrap();
        assert_eq!(result.fallback_reason(), Some(FailureReason::CallError));
    }

    #[tokio::test]
    async fn test_fenced_output_is_accepted() {
        let fenced = format!("```json\n{VALID_MOVEMENT}\n```");
        let model = Arc::new(ScriptedModel::always(Script::Reply(fenced)));
        let gateway = gateway(model, Duration::from_secs(8));

        let result = gateway.generate(&movement_request()).await.unwrap();
        assert!(result.is_conformant());
    }

    #[tokio::test]
    async fn test_unknown_feature_makes_no_call() {
        let model = Arc::new(ScriptedModel::always(Script::Reply(VALID_MOVEMENT.to_string())));
        let calls = Arc::clone(&model.calls);
        let gateway = gateway(model, Duration::from_secs(8));

        let request = GenerationRequest::builder("weather_forecast").build();
        let err = gateway.generate(&request).await.unwrap_err();

        assert!(matches!(err, GatewayError::UnknownFeature { ref feature } if feature == "weather_forecast"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_derived_fallback_uses_context() {
        let model = Arc::new(ScriptedModel::always(Script::Fail));
        let gateway = gateway(model, Duration::from_secs(8));

        let request = GenerationRequest::builder("match_report")
            .context(json!({"opponent": "Brighton"}))
            .build();
        let result = gateway.generate(&request).await.unwrap();

        assert_eq!(result.fallback_reason(), Some(FailureReason::CallError));
        assert_eq!(
            result.value()["match_summary"],
            "Report against Brighton unavailable"
        );
    }

    #[tokio::test]
    async fn test_temperature_override_reaches_model() {
        let model = Arc::new(ScriptedModel::always(Script::Reply(VALID_MOVEMENT.to_string())));
        let gateway = gateway(Arc::clone(&model) as Arc<dyn GenerationModel>, Duration::from_secs(8));

        let request = GenerationRequest::builder("movement_analysis")
            .temperature(0.2)
            .build();
        gateway.generate(&request).await.unwrap();

        assert_eq!(model.temperatures.lock().as_slice(), &[Some(0.2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let model = Arc::new(ScriptedModel::always(Script::Hang));
        let gateway = gateway(model, Duration::from_secs(8));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let err = gateway
            .generate_with_cancel(&movement_request(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Cancelled));
    }

    #[tokio::test]
    async fn test_concurrent_features_do_not_mix() {
        let gateway = Arc::new(gateway(Arc::new(EchoModel), Duration::from_secs(8)));

        let mut handles = Vec::new();
        for i in 0..16 {
            let gateway = Arc::clone(&gateway);
            handles.push(tokio::spawn(async move {
                let feature = if i % 2 == 0 { "movement_analysis" } else { "match_report" };
                let request = GenerationRequest::builder(feature).build();
                (feature, gateway.generate(&request).await.unwrap())
            }));
        }

        for handle in handles {
            let (feature, result) = handle.await.unwrap();
            assert!(result.is_conformant());
            let schema = gateway.catalog().schema(feature).unwrap();
            assert!(schema.is_conformant(result.value()));
        }
    }

    #[tokio::test]
    async fn test_bulkhead_rejection_counts_as_call_error() {
        let model = Arc::new(ScriptedModel::always(Script::Reply(VALID_MOVEMENT.to_string())));
        let calls = Arc::clone(&model.calls);
        let bulkhead = Arc::new(Bulkhead::new(
            "tiny",
            BulkheadConfig {
                max_concurrent: 1,
                queue_size: 0,
                queue_timeout: Duration::from_millis(10),
            },
        ));
        let _held = bulkhead.try_acquire().unwrap();

        let gateway = GenerationGateway::builder(catalog(), model)
            .bulkhead(Arc::clone(&bulkhead))
            .retry_policy(RetryPolicyBuilder::new().jitter(Duration::ZERO).build())
            .build()
            .unwrap();

        let result = gateway.generate(&movement_request()).await.unwrap();
        assert_eq!(result.fallback_reason(), Some(FailureReason::CallError));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
