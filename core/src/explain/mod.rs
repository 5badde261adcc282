//! Natural-language explanations for TI-RADS results
//!
//! The [`ExplanationService`] calls an external [`TextGenerator`] with a
//! prompt bound to the structured breakdown. Any failure on that path
//! degrades to a deterministic template; callers never see an error.

mod fallback;
#[cfg(feature = "http")]
mod http;
mod prompt;
mod service;

pub use fallback::{fallback_explanation, FALLBACK_ENGINE_NAME, FALLBACK_PREFIX};
#[cfg(feature = "http")]
pub use http::{GeminiGenerator, DEFAULT_GEMINI_MODEL, GEMINI_API_KEY_ENV};
pub use prompt::{
    ExplanationFeature, ExplanationInput, Prompt, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_TEMPERATURE,
};
pub use service::{ExplanationService, ExplanationState};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Why the primary generation path produced no text
///
/// Always recovered by the service; recorded on the fallback record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
#[cfg_attr(
    feature = "json",
    serde(tag = "kind", content = "detail", rename_all = "snake_case")
)]
pub enum GenerationError {
    /// Text generation is switched off in configuration
    #[error("text generation disabled")]
    Disabled,

    /// No generator is configured, or it cannot serve requests
    #[error("text generator unavailable: {0}")]
    Unavailable(String),

    /// Generator did not answer within the configured timeout
    #[error("text generation timed out after {0} ms")]
    Timeout(u64),

    /// Generator answered with blank text
    #[error("text generator returned empty text")]
    Empty,

    /// Generator call failed
    #[error("text generation failed: {0}")]
    Transport(String),
}

/// External text-generation collaborator
///
/// Implementations may block; the service runs them on a worker thread and
/// enforces its own timeout.
pub trait TextGenerator: Send + Sync {
    /// Engine (model) name recorded on generated explanations
    fn engine_name(&self) -> &str;

    /// Generates text for `prompt`
    fn generate(&self, prompt: &Prompt) -> std::result::Result<String, GenerationError>;
}

/// An explanation attached to a prediction
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize))]
pub struct ExplanationRecord {
    pub text: String,
    pub engine_name: String,
    pub is_fallback: bool,
    pub generated_at: DateTime<Utc>,
    pub input_snapshot: ExplanationInput,
    /// Why the primary path was not used, for fallback records
    #[cfg_attr(feature = "json", serde(skip_serializing_if = "Option::is_none"))]
    pub fallback_reason: Option<GenerationError>,
    pub generation_time_ms: u64,
}
