//! Gemini Files API client.
//!
//! Movement clips are uploaded with the resumable protocol (`start`, then
//! `upload, finalize` on the session URL) and polled until they leave the
//! `PROCESSING` state. Only `ACTIVE` files may be referenced from a prompt.

use crate::gemini::{GeminiClient, GeminiConfig, PROVIDER_ID};
use pitchpulse_core::GatewayError;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Processing state of an uploaded file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    /// Still being processed
    Processing,
    /// Ready to be referenced from a prompt
    Active,
    /// Processing failed upstream
    Failed,
    /// Not reported (or a state this client does not know)
    #[default]
    #[serde(other)]
    StateUnspecified,
}

/// Failure detail attached to a `FAILED` file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    /// Status code
    #[serde(default)]
    pub code: Option<i32>,
    /// Message
    #[serde(default)]
    pub message: String,
}

/// File resource as returned by the Files API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    /// Resource name (`files/abc123`)
    pub name: String,
    /// URI referenced from `fileData` prompt parts
    #[serde(default)]
    pub uri: String,
    /// MIME type
    #[serde(default)]
    pub mime_type: String,
    /// Processing state
    #[serde(default)]
    pub state: FileState,
    /// Failure detail
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FileError>,
}

#[derive(Debug, Deserialize)]
struct FileEnvelope {
    file: UploadedFile,
}

/// Files API client
#[derive(Debug, Clone)]
pub struct GeminiFiles {
    config: GeminiConfig,
    client: Client,
    poll_interval: Duration,
    processing_timeout: Duration,
}

impl GeminiFiles {
    /// Create a new client polling every 2s for up to 2 minutes
    ///
    /// # Errors
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(config: GeminiConfig) -> Result<Self, GatewayError> {
        let client = config.http_client()?;
        Ok(Self {
            config,
            client,
            poll_interval: Duration::from_secs(2),
            processing_timeout: Duration::from_secs(120),
        })
    }

    /// Pause between state polls
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// How long a file may stay in processing
    #[must_use]
    pub fn with_processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = timeout;
        self
    }

    /// `{host}/v1beta` -> `{host}/upload/v1beta/files`
    fn upload_url(&self) -> String {
        match self.config.base_url.rsplit_once('/') {
            Some((host, version)) => format!("{host}/upload/{version}/files"),
            None => format!("{}/upload/files", self.config.base_url),
        }
    }

    fn file_url(&self, name: &str) -> String {
        format!("{}/{name}", self.config.base_url)
    }

    /// Upload `bytes` and return the file as first reported (usually
    /// `PROCESSING`)
    ///
    /// # Errors
    /// Returns a provider error on transport failures, error statuses or a
    /// missing upload session
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<UploadedFile, GatewayError> {
        info!(
            display_name,
            mime_type,
            bytes = bytes.len(),
            "Uploading file to Gemini"
        );

        let start = self
            .client
            .post(self.upload_url())
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await
            .map_err(|e| self.config.transport_error(e))?;
        let start = error_for_status(start).await?;

        let session = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                GatewayError::provider(PROVIDER_ID, "Upload session URL missing", None, false)
            })?;

        let finished = self
            .client
            .post(&session)
            .header("X-Goog-Upload-Offset", 0)
            .header("X-Goog-Upload-Command", "upload, finalize")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| self.config.transport_error(e))?;
        let envelope: FileEnvelope = read_json(error_for_status(finished).await?).await?;

        debug!(name = %envelope.file.name, state = ?envelope.file.state, "Upload finalized");
        Ok(envelope.file)
    }

    /// Fetch the current state of a file
    ///
    /// # Errors
    /// Returns a provider error on transport failures or error statuses
    pub async fn get(&self, name: &str) -> Result<UploadedFile, GatewayError> {
        let response = self
            .client
            .get(self.file_url(name))
            .send()
            .await
            .map_err(|e| self.config.transport_error(e))?;
        read_json(error_for_status(response).await?).await
    }

    /// Poll until the file is `ACTIVE`
    ///
    /// # Errors
    /// Returns a non-retryable provider error when processing fails, and a
    /// timeout when the file is still processing after the configured limit
    pub async fn wait_until_active(&self, file: UploadedFile) -> Result<UploadedFile, GatewayError> {
        let started = Instant::now();
        let mut file = file;
        loop {
            match file.state {
                FileState::Active => {
                    info!(name = %file.name, "File ready");
                    return Ok(file);
                }
                FileState::Failed => {
                    let detail = file
                        .error
                        .map_or_else(|| "no detail".to_string(), |e| e.message);
                    return Err(GatewayError::provider(
                        PROVIDER_ID,
                        format!("File processing failed for {}: {detail}", file.name),
                        None,
                        false,
                    ));
                }
                FileState::Processing | FileState::StateUnspecified => {}
            }

            if started.elapsed() >= self.processing_timeout {
                warn!(name = %file.name, "File still processing, giving up");
                return Err(GatewayError::timeout(self.processing_timeout));
            }
            debug!(name = %file.name, state = ?file.state, "Waiting for file processing");
            tokio::time::sleep(self.poll_interval).await;
            file = self.get(&file.name).await?;
        }
    }

    /// Upload and wait until the file can be used
    ///
    /// # Errors
    /// See [`Self::upload`] and [`Self::wait_until_active`]
    pub async fn upload_and_wait(
        &self,
        bytes: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<UploadedFile, GatewayError> {
        let file = self.upload(bytes, mime_type, display_name).await?;
        self.wait_until_active(file).await
    }
}

async fn error_for_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GeminiClient::parse_error(status.as_u16(), None, &body))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let text = response.text().await.map_err(|e| {
        GatewayError::provider(
            PROVIDER_ID,
            format!("Failed to read response: {}", e.without_url()),
            None,
            true,
        )
    })?;
    serde_json::from_str(&text).map_err(|e| {
        GatewayError::provider(PROVIDER_ID, format!("Invalid file JSON: {e}"), None, false)
    })
}
