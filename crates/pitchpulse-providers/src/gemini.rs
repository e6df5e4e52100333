//! Gemini `generateContent` client.
//!
//! Every call runs in JSON mode: `responseMimeType` is `application/json` and,
//! when the feature schema can be expressed upstream, a `responseSchema` hint
//! is attached. The client returns the raw text of the first candidate;
//! parsing and validation happen in the gateway.
//!
//! # API Format
//! - Google AI Studio: `{base}/models/{MODEL}:generateContent`
//! - The API key travels in the `x-goog-api-key` header, never in the URL

use async_trait::async_trait;
use pitchpulse_core::{GatewayError, GenerationModel, ModelCall, Prompt, PromptPart};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Google AI Studio endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default text model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub(crate) const PROVIDER_ID: &str = "gemini";

const API_KEY_HEADER: &str = "x-goog-api-key";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Gemini client configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: SecretString,
    /// Default model for `generateContent`
    pub model: String,
    /// Model for `embedContent`
    pub embedding_model: String,
    /// API base URL
    pub base_url: String,
    /// Default sampling temperature
    pub temperature: f32,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Safety threshold applied to every harm category
    pub safety_threshold: String,
}

impl GeminiConfig {
    /// Create a configuration with defaults for the given API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            model: DEFAULT_MODEL.to_string(),
            embedding_model: crate::embed::EMBEDDING_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.1,
            timeout: Duration::from_secs(30),
            safety_threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
        }
    }

    /// Set the default model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the embedding model
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    /// Point the client at another endpoint (proxies, tests)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the default temperature
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the HTTP timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn http_client(&self) -> Result<Client, GatewayError> {
        let key = self.api_key.expose_secret().trim();
        if key.is_empty() {
            return Err(GatewayError::configuration("Gemini API key is empty"));
        }
        let mut key = HeaderValue::from_str(key).map_err(|_| {
            GatewayError::configuration("Gemini API key contains invalid header characters")
        })?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, key);

        Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayError::internal(format!("Failed to create HTTP client: {e}")))
    }

    /// Map a transport failure; the URL is stripped from the message
    pub(crate) fn transport_error(&self, e: reqwest::Error) -> GatewayError {
        let e = e.without_url();
        debug!(provider = PROVIDER_ID, error = %e, "Gemini request failed");
        if e.is_timeout() {
            GatewayError::timeout(self.timeout)
        } else {
            GatewayError::provider(PROVIDER_ID, format!("Request failed: {e}"), None, true)
        }
    }
}

/// Gemini text model client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    /// Create a new client
    ///
    /// # Errors
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        let client = config.http_client()?;
        Ok(Self { config, client })
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Build the endpoint URL for a model
    fn endpoint_url(&self, model: &str) -> String {
        format!("{}/models/{model}:generateContent", self.config.base_url)
    }

    /// Transform a model call into Gemini's request format
    fn transform_request(&self, call: &ModelCall<'_>) -> GeminiRequest {
        let system_instruction = call.prompt.system.as_ref().map(|text| GeminiContent {
            role: None,
            parts: vec![GeminiPart::Text { text: text.clone() }],
        });

        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: Self::transform_parts(call.prompt),
            }],
            system_instruction,
            generation_config: GeminiGenerationConfig {
                temperature: call.temperature.unwrap_or(self.config.temperature),
                response_mime_type: "application/json".to_string(),
                response_schema: call.response_schema.cloned(),
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| GeminiSafetySetting {
                    category: (*category).to_string(),
                    threshold: self.config.safety_threshold.clone(),
                })
                .collect(),
        }
    }

    fn transform_parts(prompt: &Prompt) -> Vec<GeminiPart> {
        prompt
            .parts
            .iter()
            .map(|part| match part {
                PromptPart::Text { text } => GeminiPart::Text { text: text.clone() },
                PromptPart::InlineData { mime_type, data } => GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: mime_type.clone(),
                        data: data.clone(),
                    },
                },
                PromptPart::FileUri { mime_type, uri } => GeminiPart::FileData {
                    file_data: GeminiFileData {
                        mime_type: mime_type.clone(),
                        file_uri: uri.clone(),
                    },
                },
            })
            .collect()
    }

    /// Pull the text of the first candidate out of a response
    fn extract_text(response: GeminiResponse) -> Result<String, GatewayError> {
        let Some(candidate) = response.candidates.into_iter().next() else {
            let reason = response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "unknown".to_string());
            return Err(GatewayError::provider(
                PROVIDER_ID,
                format!("No candidates in response (block reason: {reason})"),
                None,
                false,
            ));
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| match p {
                        GeminiPart::Text { text } => Some(text),
                        _ => None,
                    })
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let finish = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(GatewayError::provider(
                PROVIDER_ID,
                format!("Empty candidate text (finish reason: {finish})"),
                None,
                false,
            ));
        }

        Ok(text)
    }

    /// Parse error response
    pub(crate) fn parse_error(status: u16, retry_after: Option<Duration>, body: &str) -> GatewayError {
        #[derive(Deserialize)]
        struct GeminiErrorResponse {
            error: GeminiErrorDetail,
        }

        #[derive(Deserialize)]
        struct GeminiErrorDetail {
            message: String,
        }

        let message = serde_json::from_str::<GeminiErrorResponse>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("HTTP {status}: {body}"));

        match status {
            429 => GatewayError::rate_limit(retry_after),
            500..=599 => GatewayError::provider(PROVIDER_ID, message, Some(status), true),
            _ => GatewayError::provider(PROVIDER_ID, message, Some(status), false),
        }
    }
}

#[async_trait]
impl GenerationModel for GeminiClient {
    fn id(&self) -> &str {
        PROVIDER_ID
    }

    async fn generate(&self, call: ModelCall<'_>) -> Result<String, GatewayError> {
        let model = call.model.unwrap_or(&self.config.model);
        let url = self.endpoint_url(model);
        let body = self.transform_request(&call);

        debug!(
            provider = PROVIDER_ID,
            model = %model,
            feature = %call.feature,
            request_id = %call.request_id,
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.config.transport_error(e))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);
        let text = response.text().await.map_err(|e| {
            GatewayError::provider(
                PROVIDER_ID,
                format!("Failed to read response: {}", e.without_url()),
                None,
                true,
            )
        })?;

        trace!(status = %status, body = %text, "Received Gemini response");

        if !status.is_success() {
            warn!(status = status.as_u16(), "Gemini returned an error status");
            return Err(Self::parse_error(status.as_u16(), retry_after, &text));
        }

        let parsed: GeminiResponse = serde_json::from_str(&text).map_err(|e| {
            GatewayError::provider(PROVIDER_ID, format!("Invalid response JSON: {e}"), None, false)
        })?;

        Self::extract_text(parsed)
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
    safety_settings: Vec<GeminiSafetySetting>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    FileData {
        #[serde(rename = "fileData")]
        file_data: GeminiFileData,
    },
    Other(Value),
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiFileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    response_mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Serialize)]
struct GeminiSafetySetting {
    category: String,
    threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
