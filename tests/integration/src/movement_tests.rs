//! Movement analysis end to end against the mock Gemini API

use crate::*;
use pitchpulse_core::{FailureReason, GenerationResult};
use pitchpulse_features::{movement, Feature};
use pitchpulse_telemetry::AttemptOutcome;
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

fn movement_request() -> pitchpulse_core::GenerationRequest {
    Feature::MovementAnalysis
        .request_from_context(&movement_context(), VIDEO_MODEL)
        .unwrap()
}

#[tokio::test]
async fn test_conformant_output_single_call() {
    let mock = MockGemini::start().await;
    mock.mock_json(VIDEO_MODEL, &movement_output()).await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let result = gateway.generate(&movement_request()).await.unwrap();

    assert_eq!(result, GenerationResult::conformant(movement_output()));
    assert_eq!(mock.generate_calls().await, 1);
    assert_eq!(
        gateway
            .metrics()
            .attempt_count(movement::FEATURE, AttemptOutcome::Conformant),
        1
    );
    assert_eq!(gateway.metrics().result_count(movement::FEATURE, "conformant"), 1);
}

#[tokio::test]
async fn test_uploaded_clip_is_analysed() {
    let mock = MockGemini::start().await;
    let uri = mock.mock_file_upload("files/squat-0412", "video/quicktime").await;
    mock.mock_json(VIDEO_MODEL, &movement_output()).await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let file = files(&mock)
        .upload_and_wait(vec![0x00, 0x00, 0x00, 0x18], "video/quicktime", "squat.mov")
        .await
        .unwrap();
    assert_eq!(file.uri, uri);

    let context = movement::with_uploaded_clip(
        serde_json::json!({"position": "Winger"}),
        &file.uri,
        &file.mime_type,
    );
    let request = Feature::MovementAnalysis
        .request_from_context(&context, VIDEO_MODEL)
        .unwrap();
    let result = gateway.generate(&request).await.unwrap();

    assert!(result.is_conformant());
    let bodies = mock.generate_bodies().await;
    let clip = &bodies[0]["contents"][0]["parts"][0]["fileData"];
    assert_eq!(clip["fileUri"], uri.as_str());
    assert_eq!(clip["mimeType"], "video/quicktime");

    let keys = mock.api_keys().await;
    assert!(!keys.is_empty());
    assert!(keys.iter().all(|key| key == TEST_API_KEY));
}

#[tokio::test]
async fn test_slow_model_falls_back_after_two_timeouts() {
    let mock = MockGemini::start().await;
    mock.mock_json_delayed(VIDEO_MODEL, &movement_output(), Duration::from_secs(3))
        .await;
    let gateway = gateway(&mock, test_policy(Duration::from_millis(200)));

    let started = Instant::now();
    let result = gateway.generate(&movement_request()).await.unwrap();

    assert_eq!(
        result,
        GenerationResult::fallback(movement::fallback(), FailureReason::Timeout)
    );
    assert_eq!(mock.generate_calls().await, 2);
    assert!(started.elapsed() < Duration::from_secs(3));
    assert_eq!(
        gateway
            .metrics()
            .attempt_count(movement::FEATURE, AttemptOutcome::Timeout),
        2
    );
}

#[tokio::test]
async fn test_missing_field_is_repaired_by_second_attempt() {
    let mock = MockGemini::start().await;
    mock.mock_json_once(VIDEO_MODEL, &movement_output_without_confidence())
        .await;
    mock.mock_json(VIDEO_MODEL, &movement_output()).await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let result = gateway.generate(&movement_request()).await.unwrap();

    assert!(result.is_conformant());
    assert_eq!(result.value()["confidence"], 0.82);
    assert_eq!(mock.generate_calls().await, 2);
    assert_eq!(
        gateway
            .metrics()
            .attempt_count(movement::FEATURE, AttemptOutcome::SchemaValidation),
        1
    );
}

#[tokio::test]
async fn test_request_body_carries_clip_and_schema() {
    let mock = MockGemini::start().await;
    mock.mock_json(VIDEO_MODEL, &movement_output()).await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    gateway.generate(&movement_request()).await.unwrap();

    let bodies = mock.generate_bodies().await;
    let body = &bodies[0];
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(
        parts[0]["fileData"]["fileUri"],
        "https://generativelanguage.googleapis.com/v1beta/files/abc123"
    );
    assert_eq!(parts[0]["fileData"]["mimeType"], "video/mp4");
    assert!(parts[1]["text"].is_string());

    let system = body["systemInstruction"]["parts"][0]["text"].as_str().unwrap();
    assert!(system.contains("Winger"));

    let config = &body["generationConfig"];
    assert_eq!(config["responseMimeType"], "application/json");
    assert!((config["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    assert_eq!(
        config["responseSchema"]["required"],
        serde_json::json!(["mechanical_risk_band", "flags", "coaching_cues", "confidence"])
    );
    assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_concurrent_generations_are_independent() {
    let mock = MockGemini::start().await;
    mock.mock_json(VIDEO_MODEL, &movement_output()).await;
    let gateway = std::sync::Arc::new(gateway(&mock, test_policy(Duration::from_secs(5))));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.generate(&movement_request()).await })
        })
        .collect();
    let results = futures::future::join_all(tasks).await;

    for result in results {
        assert!(result.unwrap().unwrap().is_conformant());
    }
    assert_eq!(mock.generate_calls().await, 8);
}
