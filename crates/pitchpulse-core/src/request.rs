//! Generation request types.
//!
//! A [`GenerationRequest`] is built once per caller invocation and never
//! mutated afterwards; the gateway only reads it.

use crate::feature::FeatureName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Unique request identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random identifier
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID
    #[must_use]
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One ordered piece of prompt content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PromptPart {
    /// Plain text
    Text {
        /// The text
        text: String,
    },
    /// Base64-encoded binary content sent inline
    InlineData {
        /// MIME type (e.g. `image/jpeg`)
        mime_type: String,
        /// Base64 payload
        data: String,
    },
    /// Reference to content already uploaded to the provider
    FileUri {
        /// MIME type (e.g. `video/mp4`)
        mime_type: String,
        /// Provider file URI
        uri: String,
    },
}

impl PromptPart {
    /// Create a text part
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a file reference part
    #[must_use]
    pub fn file(mime_type: impl Into<String>, uri: impl Into<String>) -> Self {
        Self::FileUri {
            mime_type: mime_type.into(),
            uri: uri.into(),
        }
    }
}

/// Prompt payload handed to the upstream model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// System instruction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// User content, in order
    pub parts: Vec<PromptPart>,
}

impl Prompt {
    /// Prompt with a system instruction and one user text part
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            parts: vec![PromptPart::text(user)],
        }
    }

    /// Append a part
    #[must_use]
    pub fn with_part(mut self, part: PromptPart) -> Self {
        self.parts.push(part);
        self
    }

    /// All text parts joined by newlines
    #[must_use]
    pub fn user_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the prompt carries any user content
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// One structured-generation request
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    id: RequestId,
    feature: FeatureName,
    prompt: Prompt,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    created_at: DateTime<Utc>,
}

impl GenerationRequest {
    /// Create a new builder
    #[must_use]
    pub fn builder(feature: impl Into<FeatureName>) -> GenerationRequestBuilder {
        GenerationRequestBuilder {
            feature: feature.into(),
            id: None,
            prompt: Prompt::default(),
            context: None,
            model: None,
            temperature: None,
        }
    }

    /// Request identifier
    #[must_use]
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Feature whose schema applies
    #[must_use]
    pub fn feature(&self) -> &FeatureName {
        &self.feature
    }

    /// Prompt payload
    #[must_use]
    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Structured input the prompt was assembled from
    #[must_use]
    pub fn context(&self) -> Option<&Value> {
        self.context.as_ref()
    }

    /// Model override for this request
    #[must_use]
    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Temperature override for this request
    #[must_use]
    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    /// Creation timestamp
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Builder for `GenerationRequest`
#[derive(Debug)]
pub struct GenerationRequestBuilder {
    feature: FeatureName,
    id: Option<RequestId>,
    prompt: Prompt,
    context: Option<Value>,
    model: Option<String>,
    temperature: Option<f32>,
}

impl GenerationRequestBuilder {
    /// Set the request ID
    #[must_use]
    pub fn id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the prompt
    #[must_use]
    pub fn prompt(mut self, prompt: Prompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Attach the structured context (used by context-derived fallbacks)
    #[must_use]
    pub fn context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Override the upstream model for this request
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Override the sampling temperature for this request
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Build the request
    #[must_use]
    pub fn build(self) -> GenerationRequest {
        GenerationRequest {
            id: self.id.unwrap_or_else(RequestId::generate),
            feature: self.feature,
            prompt: self.prompt,
            context: self.context,
            model: self.model,
            temperature: self.temperature,
            created_at: Utc::now(),
        }
    }
}
