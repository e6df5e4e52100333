//! # PitchPulse Providers
//!
//! Clients for Google's Gemini API (Google AI Studio):
//! - `generateContent` in JSON mode, implementing [`GenerationModel`]
//! - `embedContent`, implementing [`Embedder`]
//! - the Files API, which turns a clip into a URI prompts can reference
//!
//! [`GenerationModel`]: pitchpulse_core::GenerationModel
//! [`Embedder`]: pitchpulse_core::Embedder

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod embed;
pub mod files;
pub mod gemini;

pub use embed::{GeminiEmbedder, EMBEDDING_MODEL};
pub use files::{FileState, GeminiFiles, UploadedFile};
pub use gemini::{GeminiClient, GeminiConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
