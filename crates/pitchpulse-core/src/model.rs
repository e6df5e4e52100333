//! Upstream model abstraction.

use crate::error::GatewayError;
use crate::feature::FeatureName;
use crate::request::{Prompt, RequestId};
use async_trait::async_trait;
use serde_json::Value;

/// Everything a model client needs for one upstream call
#[derive(Debug, Clone, Copy)]
pub struct ModelCall<'a> {
    /// Originating request
    pub request_id: RequestId,
    /// Feature being generated
    pub feature: &'a FeatureName,
    /// Prompt payload
    pub prompt: &'a Prompt,
    /// Expected-output schema hint, when the schema can be expressed upstream
    pub response_schema: Option<&'a Value>,
    /// Model override; `None` uses the client's default
    pub model: Option<&'a str>,
    /// Temperature override; `None` uses the client's default
    pub temperature: Option<f32>,
}

/// A text model that answers with a raw JSON document.
///
/// Implementations return the model's text verbatim; parsing and schema
/// validation belong to the gateway.
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Provider identifier used in logs and errors
    fn id(&self) -> &str;

    /// Issue one upstream call and return the raw response text
    async fn generate(&self, call: ModelCall<'_>) -> Result<String, GatewayError>;
}

/// Turns text into a dense vector for similarity search
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed one document
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError>;
}
