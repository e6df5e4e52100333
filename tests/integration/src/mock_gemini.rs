//! Mock Gemini API for integration testing
//!
//! Provides a wiremock-based server answering `generateContent`,
//! `embedContent` and the Files API the way the Gemini API does.

use serde_json::{json, Value};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// API version segment of the base URL
pub const API_VERSION: &str = "/v1beta";

/// Mock Gemini API server
pub struct MockGemini {
    pub server: MockServer,
}

impl MockGemini {
    /// Start a new mock server
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL to configure the clients with
    pub fn base_url(&self) -> String {
        format!("{}{API_VERSION}", self.server.uri())
    }

    fn generate_path(model: &str) -> String {
        format!("{API_VERSION}/models/{model}:generateContent")
    }

    /// Answer every call to `model` with `text` as the candidate text
    pub async fn mock_text(&self, model: &str, text: &str) {
        Mock::given(method("POST"))
            .and(path(Self::generate_path(model)))
            .respond_with(ResponseTemplate::new(200).set_body_json(generate_response(text)))
            .mount(&self.server)
            .await;
    }

    /// Answer every call to `model` with `value` serialized as the candidate text
    pub async fn mock_json(&self, model: &str, value: &Value) {
        self.mock_text(model, &value.to_string()).await;
    }

    /// Answer only the next call to `model` with `value`; mount before the
    /// steady-state mock
    pub async fn mock_json_once(&self, model: &str, value: &Value) {
        Mock::given(method("POST"))
            .and(path(Self::generate_path(model)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(generate_response(&value.to_string())),
            )
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Answer every call to `model` with `value` after `delay`
    pub async fn mock_json_delayed(&self, model: &str, value: &Value, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(Self::generate_path(model)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(generate_response(&value.to_string()))
                    .set_delay(delay),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer every call to `model` with an HTTP error
    pub async fn mock_status(&self, model: &str, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path(Self::generate_path(model)))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_response(status, message)))
            .mount(&self.server)
            .await;
    }

    /// Answer only the next call to `model` with an HTTP error
    pub async fn mock_status_once(&self, model: &str, status: u16, message: &str) {
        Mock::given(method("POST"))
            .and(path(Self::generate_path(model)))
            .respond_with(ResponseTemplate::new(status).set_body_json(error_response(status, message)))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    /// Answer every embedding call with keyword-count vectors
    pub async fn mock_embeddings(&self, model: &str, keywords: &[&str]) {
        Mock::given(method("POST"))
            .and(path(format!("{API_VERSION}/models/{model}:embedContent")))
            .respond_with(KeywordEmbedding::new(keywords))
            .mount(&self.server)
            .await;
    }

    /// Accept one resumable upload of `name` (`files/...`). The file reports
    /// `PROCESSING` until it has been polled once, then `ACTIVE`.
    pub async fn mock_file_upload(&self, name: &str, mime_type: &str) -> String {
        let uri = format!("{}/{name}", self.base_url());
        let file = |state: &str| {
            json!({
                "name": name,
                "mimeType": mime_type,
                "uri": uri,
                "state": state
            })
        };

        Mock::given(method("POST"))
            .and(path(format!("/upload{API_VERSION}/files")))
            .respond_with(ResponseTemplate::new(200).insert_header(
                "x-goog-upload-url",
                format!("{}/upload-session/{name}", self.server.uri()),
            ))
            .mount(&self.server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/upload-session/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "file": file("PROCESSING") })))
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{API_VERSION}/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(file("PROCESSING")))
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{API_VERSION}/{name}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(file("ACTIVE")))
            .mount(&self.server)
            .await;

        uri
    }

    /// API keys sent with every request received so far
    pub async fn api_keys(&self) -> Vec<String> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| request.headers.get("x-goog-api-key"))
            .filter_map(|value| value.to_str().ok().map(str::to_string))
            .collect()
    }

    /// Bodies of the `generateContent` calls received so far
    pub async fn generate_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|request| request.url.path().ends_with(":generateContent"))
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }

    /// Number of `generateContent` calls received so far
    pub async fn generate_calls(&self) -> usize {
        self.generate_bodies().await.len()
    }
}

/// Embedding responder: one dimension per keyword, valued by how often the
/// keyword occurs in the embedded text
pub struct KeywordEmbedding {
    keywords: Vec<String>,
}

impl KeywordEmbedding {
    /// Create a responder over `keywords`
    pub fn new(keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.keywords
            .iter()
            .map(|keyword| lower.matches(keyword.as_str()).count() as f32)
            .collect()
    }
}

impl Respond for KeywordEmbedding {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let text = body["content"]["parts"][0]["text"].as_str().unwrap_or_default();
        ResponseTemplate::new(200).set_body_json(json!({
            "embedding": { "values": self.vector(text) }
        }))
    }
}

/// Gemini `generateContent` response with a single text candidate
pub fn generate_response(text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{ "text": text }]
            },
            "finishReason": "STOP",
            "index": 0
        }],
        "usageMetadata": {
            "promptTokenCount": 412,
            "candidatesTokenCount": 96,
            "totalTokenCount": 508
        }
    })
}

/// Gemini error body
pub fn error_response(code: u16, message: &str) -> Value {
    json!({
        "error": {
            "code": code,
            "message": message,
            "status": if code == 429 { "RESOURCE_EXHAUSTED" } else { "INTERNAL" }
        }
    })
}
