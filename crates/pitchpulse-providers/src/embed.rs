//! Gemini `embedContent` client.

use crate::gemini::{GeminiClient, GeminiConfig, PROVIDER_ID};
use async_trait::async_trait;
use pitchpulse_core::{Embedder, GatewayError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default embedding model
pub const EMBEDDING_MODEL: &str = "models/gemini-embedding-001";

const TASK_TYPE: &str = "RETRIEVAL_DOCUMENT";

/// Document embedder backed by Gemini
#[derive(Debug, Clone)]
pub struct GeminiEmbedder {
    config: GeminiConfig,
    client: Client,
}

impl GeminiEmbedder {
    /// Create a new embedder
    ///
    /// # Errors
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    fn model_path(&self) -> String {
        let model = &self.config.embedding_model;
        if model.starts_with("models/") {
            model.clone()
        } else {
            format!("models/{model}")
        }
    }

    fn endpoint_url(&self) -> String {
        format!("{}/{}:embedContent", self.config.base_url, self.model_path())
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, GatewayError> {
        let body = EmbedRequest {
            model: self.model_path(),
            content: EmbedContent {
                parts: vec![EmbedPart { text }],
            },
            task_type: TASK_TYPE,
        };

        debug!(model = %body.model, chars = text.len(), "Sending embedContent request");

        let response = self
            .client
            .post(self.endpoint_url())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.config.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            GatewayError::provider(
                PROVIDER_ID,
                format!("Failed to read response: {}", e.without_url()),
                None,
                true,
            )
        })?;

        if !status.is_success() {
            return Err(GeminiClient::parse_error(status.as_u16(), None, &text));
        }

        let parsed: EmbedResponse = serde_json::from_str(&text).map_err(|e| {
            GatewayError::provider(PROVIDER_ID, format!("Invalid embedding JSON: {e}"), None, false)
        })?;

        if parsed.embedding.values.is_empty() {
            return Err(GatewayError::provider(PROVIDER_ID, "Empty embedding", None, false));
        }
        Ok(parsed.embedding.values)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct EmbedContent<'a> {
    parts: Vec<EmbedPart<'a>>,
}

#[derive(Debug, Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: EmbedValues,
}

#[derive(Debug, Deserialize)]
struct EmbedValues {
    values: Vec<f32>,
}
