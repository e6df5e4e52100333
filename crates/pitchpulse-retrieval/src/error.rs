//! Retrieval errors.

use pitchpulse_core::GatewayError;
use thiserror::Error;

/// Errors raised by the knowledge base and vector store
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The embedder failed
    #[error("Embedding failed: {0}")]
    Embedding(#[from] GatewayError),

    /// The seed document could not be parsed
    #[error("Invalid knowledge base seed: {0}")]
    InvalidSeed(#[from] serde_json::Error),

    /// Batch inputs of different lengths
    #[error("Batch length mismatch: {ids} ids, {vectors} vectors, {payloads} payloads")]
    BatchLengthMismatch {
        /// Number of ids
        ids: usize,
        /// Number of vectors
        vectors: usize,
        /// Number of payloads
        payloads: usize,
    },
}

/// Result alias for retrieval operations
pub type RetrievalResult<T> = Result<T, RetrievalError>;
