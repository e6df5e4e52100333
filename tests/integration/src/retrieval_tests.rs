//! Knowledge-base seeding and search over the mock embedding endpoint

use crate::*;
use pitchpulse_retrieval::{player_week_document, KnowledgeBase, KnowledgeSeed, PlayerWeek};
use pretty_assertions::assert_eq;
use serde_json::Map;
use std::sync::Arc;

const KEYWORDS: [&str; 6] = ["hamstring", "acwr", "turf", "calf", "monotony", "sleep"];

async fn seeded_knowledge_base(mock: &MockGemini) -> KnowledgeBase {
    mock.mock_embeddings(EMBEDDING_MODEL, &KEYWORDS).await;
    let knowledge = KnowledgeBase::new(Arc::new(embedder(mock)));
    let stored = knowledge
        .seed(&KnowledgeSeed::bundled().unwrap())
        .await
        .unwrap();
    assert_eq!(stored, 7);
    knowledge
}

#[tokio::test]
async fn test_similar_case_search() {
    let mock = MockGemini::start().await;
    let knowledge = seeded_knowledge_base(&mock).await;

    let cases = knowledge
        .search_similar_cases("winger with hamstring tightness", 1, Some("PitchPulse_CaseStudy"))
        .await
        .unwrap();

    assert_eq!(cases.len(), 1);
    assert_eq!(
        cases[0].player_name,
        "Winger hamstring strain after congested period"
    );
    assert!(cases[0].similarity_score > 0.0);
}

#[tokio::test]
async fn test_playbook_search() {
    let mock = MockGemini::start().await;
    let knowledge = seeded_knowledge_base(&mock).await;

    let rules = knowledge.search_playbook("monotony monotony", 1).await.unwrap();

    assert_eq!(rules.len(), 1);
    assert!(rules[0].contains("Training Monotony"));
}

#[tokio::test]
async fn test_player_week_ingestion() {
    let mock = MockGemini::start().await;
    let knowledge = seeded_knowledge_base(&mock).await;

    let week = PlayerWeek {
        player_name: "Marcus".to_string(),
        week_start: "2026-03-02".to_string(),
        risk_score: 77.0,
        readiness: 41.0,
        acwr: 1.62,
        monotony: 1.4,
        strain: 2400.0,
        last_match_minutes: 90.0,
        drivers: vec!["Poor sleep".to_string(), "Accumulated sleep debt".to_string()],
        recommended_action: "Reduce volume".to_string(),
    };
    let id = knowledge
        .upsert_player_week(
            "p-10",
            "Marcus",
            "2026-03-02",
            &player_week_document(&week),
            Map::new(),
        )
        .await
        .unwrap();
    assert_eq!(id, 7);

    let cases = knowledge.search_similar_cases("sleep", 1, None).await.unwrap();
    assert_eq!(cases[0].player_id, "p-10");
    assert_eq!(cases[0].week_label, "2026-03-02");
}

#[tokio::test]
async fn test_embedding_failure_stores_nothing() {
    let mock = MockGemini::start().await;
    let knowledge = KnowledgeBase::new(Arc::new(embedder(&mock)));

    let result = knowledge.seed(&KnowledgeSeed::bundled().unwrap()).await;

    assert!(result.is_err());
    assert!(knowledge.is_empty());
}
