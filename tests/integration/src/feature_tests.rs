//! Text features and their fallbacks against the mock Gemini API

use crate::*;
use pitchpulse_core::{FailureReason, GatewayError};
use pitchpulse_features::{lineup, match_report, vitals, Feature};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;

fn request(feature: Feature, context: &serde_json::Value) -> pitchpulse_core::GenerationRequest {
    feature.request_from_context(context, VIDEO_MODEL).unwrap()
}

#[tokio::test]
async fn test_server_errors_fall_back_to_vitals_heuristic() {
    let mock = MockGemini::start().await;
    mock.mock_status(TEXT_MODEL, 500, "Internal error encountered.")
        .await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let result = gateway
        .generate(&request(Feature::VitalsFusion, &vitals_context()))
        .await
        .unwrap();

    assert_eq!(result.fallback_reason(), Some(FailureReason::CallError));
    assert_eq!(result.value()["readiness_flag"], "ALERT");
    assert_eq!(result.value()["readiness_delta"], -15.0);
    assert!(vitals::schema().is_conformant(result.value()));
    assert_eq!(mock.generate_calls().await, 2);
}

#[tokio::test]
async fn test_malformed_output_falls_back_to_ranked_lineup() {
    let mock = MockGemini::start().await;
    mock.mock_text(TEXT_MODEL, "Here is my suggested lineup: 4-3-3 with")
        .await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let result = gateway
        .generate(&request(Feature::SuggestedXi, &lineup_context()))
        .await
        .unwrap();

    assert_eq!(result.fallback_reason(), Some(FailureReason::MalformedPayload));
    let value = result.value();
    assert_eq!(
        value["starting_xi_ids"],
        json!(["gk1", "d0", "d1", "d2", "d3", "m0", "m1", "m2", "f0", "f1", "f2"])
    );
    assert_eq!(value["bench_ids"], json!(["gk2", "d4", "m3", "f3"]));
    assert!(value["player_rationales"]["m0"]
        .as_str()
        .unwrap()
        .starts_with("Player m0 selected"));
    assert!(lineup::schema().is_conformant(value));
}

#[tokio::test]
async fn test_short_lineup_is_retried_then_falls_back() {
    let mock = MockGemini::start().await;
    mock.mock_json(
        TEXT_MODEL,
        &json!({
            "best_formation": "4-3-3",
            "tactical_analysis": "Press high with the front three.",
            "starting_xi_ids": ["gk1", "d0", "m0"],
            "bench_ids": [],
            "player_rationales": {"gk1": "Sharp in training"}
        }),
    )
    .await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let result = gateway
        .generate(&request(Feature::SuggestedXi, &lineup_context()))
        .await
        .unwrap();

    assert_eq!(result.fallback_reason(), Some(FailureReason::SchemaValidation));
    assert_eq!(result.value()["starting_xi_ids"].as_array().unwrap().len(), 11);
    assert_eq!(mock.generate_calls().await, 2);

    let bodies = mock.generate_bodies().await;
    let hint = &bodies[0]["generationConfig"]["responseSchema"];
    assert_eq!(hint["properties"]["best_formation"]["enum"], json!(lineup::FORMATIONS));
    assert_eq!(hint["properties"]["starting_xi_ids"]["maxItems"], json!(11));
}

#[tokio::test]
async fn test_fenced_match_report_is_accepted() {
    let mock = MockGemini::start().await;
    let fenced = format!("```json\n{}\n```", match_report_output());
    mock.mock_text(TEXT_MODEL, &fenced).await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let result = gateway
        .generate(&request(Feature::MatchReport, &match_report_context()))
        .await
        .unwrap();

    assert!(result.is_conformant());
    assert_eq!(result.value(), &match_report_output());
    assert_eq!(mock.generate_calls().await, 1);
}

#[tokio::test]
async fn test_rate_limit_then_success() {
    let mock = MockGemini::start().await;
    mock.mock_status_once(TEXT_MODEL, 429, "Resource has been exhausted")
        .await;
    mock.mock_json(TEXT_MODEL, &match_report_output()).await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let result = gateway
        .generate(&request(Feature::MatchReport, &match_report_context()))
        .await
        .unwrap();

    assert!(result.is_conformant());
    assert_eq!(mock.generate_calls().await, 2);
}

#[tokio::test]
async fn test_wrong_types_fall_back_to_static_value() {
    let mock = MockGemini::start().await;
    mock.mock_json(
        TEXT_MODEL,
        &json!({
            "match_summary": "Comfortable win.",
            "squad_load_assessment": 3,
            "critical_flags": "none"
        }),
    )
    .await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let result = gateway
        .generate(&request(Feature::MatchReport, &match_report_context()))
        .await
        .unwrap();

    assert_eq!(result.fallback_reason(), Some(FailureReason::SchemaValidation));
    assert_eq!(result.value(), &match_report::fallback());
}

#[tokio::test]
async fn test_unknown_feature_makes_no_calls() {
    let mock = MockGemini::start().await;
    mock.mock_json(TEXT_MODEL, &match_report_output()).await;
    let gateway = gateway(&mock, test_policy(Duration::from_secs(5)));

    let request = pitchpulse_core::GenerationRequest::builder("injury_forecast")
        .prompt(pitchpulse_core::Prompt::new("system", "user"))
        .build();
    let err = gateway.generate(&request).await.unwrap_err();

    assert!(matches!(err, GatewayError::UnknownFeature { ref feature } if feature == "injury_forecast"));
    assert_eq!(mock.generate_calls().await, 0);
}
