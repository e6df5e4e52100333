//! # PitchPulse Retrieval
//!
//! Similar-case search for the action plan feature:
//! - [`player_week_document`]: canonical player-week text, shared by
//!   ingestion and queries
//! - [`InMemoryVectorStore`]: cosine top-k search
//! - [`KnowledgeBase`]: seeding, player-week upserts and similar-case search
//!   on top of any [`Embedder`](pitchpulse_core::Embedder)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod document;
pub mod error;
pub mod knowledge;
pub mod store;

// Re-export main types
pub use document::{player_week_document, PlayerWeek};
pub use error::{RetrievalError, RetrievalResult};
pub use knowledge::{
    CaseContext, DocType, KnowledgeBase, KnowledgeSeed, PlaybookRule, SeedCase, SimilarCase,
    BUNDLED_SEED,
};
pub use store::{cosine_similarity, InMemoryVectorStore, Payload, ScoredPoint};
