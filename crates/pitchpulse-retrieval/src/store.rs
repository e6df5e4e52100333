//! In-memory vector store with cosine similarity search.

use crate::error::{RetrievalError, RetrievalResult};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Document metadata stored next to a vector
pub type Payload = Map<String, Value>;

#[derive(Debug, Clone)]
struct Entry {
    vector: Vec<f32>,
    payload: Payload,
}

/// One search hit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredPoint {
    /// Document id
    pub id: u64,
    /// Cosine similarity to the query
    pub score: f64,
    /// Stored metadata
    pub payload: Payload,
}

/// Cosine similarity over the common prefix of two vectors; 0 when either
/// has zero magnitude
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut mag_a, mut mag_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}

/// Thread-safe in-memory vector store
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<HashMap<u64, Entry>>,
}

impl InMemoryVectorStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one document
    pub fn upsert(&self, id: u64, vector: Vec<f32>, payload: Payload) {
        self.entries.write().insert(id, Entry { vector, payload });
    }

    /// Insert or replace many documents at once
    ///
    /// # Errors
    /// Returns `BatchLengthMismatch` if the three inputs differ in length;
    /// nothing is written in that case
    pub fn batch_upsert(
        &self,
        ids: Vec<u64>,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<Payload>,
    ) -> RetrievalResult<()> {
        if ids.len() != vectors.len() || ids.len() != payloads.len() {
            return Err(RetrievalError::BatchLengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
                payloads: payloads.len(),
            });
        }

        let mut entries = self.entries.write();
        for ((id, vector), payload) in ids.into_iter().zip(vectors).zip(payloads) {
            entries.insert(id, Entry { vector, payload });
        }
        Ok(())
    }

    /// The `top_k` most similar documents accepted by `filter`, best first
    pub fn search_filtered<F>(&self, query: &[f32], top_k: usize, filter: F) -> Vec<ScoredPoint>
    where
        F: Fn(&Payload) -> bool,
    {
        let entries = self.entries.read();
        let mut hits: Vec<ScoredPoint> = entries
            .iter()
            .filter(|(_, entry)| filter(&entry.payload))
            .map(|(id, entry)| ScoredPoint {
                id: *id,
                score: cosine_similarity(query, &entry.vector),
                payload: entry.payload.clone(),
            })
            .collect();
        drop(entries);

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        hits
    }

    /// The `top_k` most similar documents, best first
    #[must_use]
    pub fn search(&self, query: &[f32], top_k: usize) -> Vec<ScoredPoint> {
        self.search_filtered(query, top_k, |_| true)
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
