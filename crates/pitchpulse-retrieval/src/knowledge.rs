//! Knowledge base: playbook rules, historical cases and player-weeks.

use crate::error::{RetrievalError, RetrievalResult};
use crate::store::{InMemoryVectorStore, Payload, ScoredPoint};
use pitchpulse_core::Embedder;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Seed document bundled with the crate
pub const BUNDLED_SEED: &str = include_str!("../data/knowledge_base_seed.json");

const PLAYBOOK_SOURCE: &str = "PitchPulse_Playbook";
const CASE_SOURCE: &str = "PitchPulse_CaseStudy";
const SUMMARY_CHARS: usize = 200;

/// Kind of stored document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    /// Club playbook rule
    PlaybookRule,
    /// Documented historical case
    HistoricalCase,
    /// Ingested player-week
    PlayerWeek,
}

/// A club playbook rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybookRule {
    /// Short topic
    pub topic: String,
    /// The rule
    pub rule_text: String,
    /// Origin label
    #[serde(default)]
    pub source: Option<String>,
}

/// Metrics of a historical case
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseContext {
    /// Playing position
    pub position: Option<String>,
    /// Injury risk score
    pub risk_score: f64,
    /// Readiness score
    pub readiness_score: f64,
    /// Acute:chronic workload ratio
    pub acwr: f64,
    /// Training monotony
    pub monotony: f64,
    /// Risk drivers
    pub drivers: Vec<String>,
}

/// A documented historical case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedCase {
    /// Short topic
    pub topic: String,
    /// Metrics at the time
    #[serde(default)]
    pub context_data: CaseContext,
    /// What was done
    #[serde(default)]
    pub intervention: Option<String>,
    /// What happened next
    #[serde(default)]
    pub outcome: Option<String>,
    /// Origin label
    #[serde(default)]
    pub source: Option<String>,
}

/// Seed document: playbook rules and historical cases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSeed {
    /// Rules
    #[serde(default)]
    pub playbook_rules: Vec<PlaybookRule>,
    /// Cases
    #[serde(default)]
    pub historical_cases: Vec<SeedCase>,
}

impl KnowledgeSeed {
    /// Parse a seed document
    ///
    /// # Errors
    /// Returns `InvalidSeed` if the JSON does not match the seed layout
    pub fn from_json_str(json: &str) -> RetrievalResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The seed bundled with the crate
    ///
    /// # Errors
    /// Returns `InvalidSeed` if the bundled document is malformed
    pub fn bundled() -> RetrievalResult<Self> {
        Self::from_json_str(BUNDLED_SEED)
    }
}

fn playbook_document(rule: &PlaybookRule) -> String {
    format!("Playbook Rule: {}. {}", rule.topic, rule.rule_text)
}

fn case_document(case: &SeedCase) -> String {
    let ctx = &case.context_data;
    format!(
        "Historical Case: {}. Position: {}. Risk: {}, Readiness: {}. ACWR: {}, Monotony: {}. \
         Drivers: {}. Intervention: {}. Outcome: {}.",
        case.topic,
        ctx.position.as_deref().unwrap_or("Unknown"),
        ctx.risk_score,
        ctx.readiness_score,
        ctx.acwr,
        ctx.monotony,
        ctx.drivers.join(", "),
        case.intervention.as_deref().unwrap_or("None"),
        case.outcome.as_deref().unwrap_or("Unknown"),
    )
}

/// A similar document, shaped for the mobile client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarCase {
    /// Player id; empty for seeded documents
    pub player_id: String,
    /// Player name, or the topic for seeded documents
    pub player_name: String,
    /// Week, or the topic for seeded documents
    pub week_label: String,
    /// Cosine similarity rounded to 3 decimals
    pub similarity_score: f64,
    /// First 200 characters of the document
    pub summary: String,
    /// Outcome, or the intervention when no outcome is stored
    pub outcome: String,
}

impl SimilarCase {
    fn from_point(point: &ScoredPoint) -> Self {
        let text = |key: &str| point.payload.get(key).and_then(Value::as_str);
        Self {
            player_id: text("player_id").unwrap_or_default().to_string(),
            player_name: text("player_name")
                .or_else(|| text("topic"))
                .unwrap_or("Historical Case")
                .to_string(),
            week_label: text("week")
                .or_else(|| text("topic"))
                .unwrap_or_default()
                .to_string(),
            similarity_score: (point.score * 1000.0).round() / 1000.0,
            summary: text("text")
                .unwrap_or_default()
                .chars()
                .take(SUMMARY_CHARS)
                .collect(),
            outcome: text("outcome")
                .or_else(|| text("intervention"))
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Embedding-backed knowledge base over an in-memory store
pub struct KnowledgeBase {
    embedder: Arc<dyn Embedder>,
    store: InMemoryVectorStore,
    next_id: AtomicU64,
}

impl KnowledgeBase {
    /// Create an empty knowledge base
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            store: InMemoryVectorStore::new(),
            next_id: AtomicU64::new(0),
        }
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Embed and store every rule and case of `seed`; returns how many
    /// documents were stored.
    ///
    /// # Errors
    /// Returns `Embedding` if any document fails to embed; nothing is stored
    /// in that case
    pub async fn seed(&self, seed: &KnowledgeSeed) -> RetrievalResult<usize> {
        let mut documents: Vec<(String, Payload)> = Vec::new();

        for rule in &seed.playbook_rules {
            let text = playbook_document(rule);
            let payload = json!({
                "source": rule.source.as_deref().unwrap_or(PLAYBOOK_SOURCE),
                "topic": rule.topic,
                "doc_type": DocType::PlaybookRule,
                "text": text,
            });
            documents.push((text, into_payload(payload)));
        }

        for case in &seed.historical_cases {
            let text = case_document(case);
            let payload = json!({
                "source": case.source.as_deref().unwrap_or(CASE_SOURCE),
                "topic": case.topic,
                "doc_type": DocType::HistoricalCase,
                "text": text,
                "outcome": case.outcome.as_deref().unwrap_or_default(),
                "intervention": case.intervention.as_deref().unwrap_or_default(),
            });
            documents.push((text, into_payload(payload)));
        }

        let mut vectors = Vec::with_capacity(documents.len());
        for (text, _) in &documents {
            vectors.push(self.embedder.embed(text).await?);
        }

        let ids: Vec<u64> = documents.iter().map(|_| self.allocate_id()).collect();
        let payloads: Vec<Payload> = documents.into_iter().map(|(_, payload)| payload).collect();
        let count = ids.len();
        self.store.batch_upsert(ids, vectors, payloads)?;

        info!(documents = count, "Seeded knowledge base");
        Ok(count)
    }

    /// Embed and store one player-week document
    ///
    /// # Errors
    /// Returns `Embedding` if the document fails to embed
    pub async fn upsert_player_week(
        &self,
        player_id: &str,
        player_name: &str,
        week: &str,
        document: &str,
        metadata: Payload,
    ) -> RetrievalResult<u64> {
        let vector = self.embedder.embed(document).await?;

        let mut payload = into_payload(json!({
            "player_id": player_id,
            "player_name": player_name,
            "week": week,
            "doc_type": DocType::PlayerWeek,
            "text": document,
        }));
        payload.extend(metadata);

        let id = self.allocate_id();
        self.store.upsert(id, vector, payload);
        info!(player = player_name, week, id, "Upserted player-week");
        Ok(id)
    }

    /// The `k` documents most similar to `query`, optionally restricted to
    /// one `source` label
    ///
    /// # Errors
    /// Returns `Embedding` if the query fails to embed
    pub async fn search_similar_cases(
        &self,
        query: &str,
        k: usize,
        source_filter: Option<&str>,
    ) -> RetrievalResult<Vec<SimilarCase>> {
        let vector = self.embedder.embed(query).await?;
        let hits = self.store.search_filtered(&vector, k, |payload| {
            source_filter.map_or(true, |source| {
                payload.get("source").and_then(Value::as_str) == Some(source)
            })
        });

        debug!(k, hits = hits.len(), source = ?source_filter, "Similar-case search");
        Ok(hits.iter().map(SimilarCase::from_point).collect())
    }

    /// Text of the `k` playbook rules most relevant to `query`
    ///
    /// # Errors
    /// Returns `Embedding` if the query fails to embed
    pub async fn search_playbook(&self, query: &str, k: usize) -> RetrievalResult<Vec<String>> {
        let vector = self.embedder.embed(query).await?;
        let rule = json!(DocType::PlaybookRule);
        let hits = self
            .store
            .search_filtered(&vector, k, |payload| payload.get("doc_type") == Some(&rule));

        Ok(hits
            .iter()
            .filter_map(|hit| hit.payload.get("text").and_then(Value::as_str))
            .map(ToString::to_string)
            .collect())
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether nothing is stored
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl std::fmt::Debug for KnowledgeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeBase")
            .field("documents", &self.store.len())
            .field("next_id", &self.next_id.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

fn into_payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}
