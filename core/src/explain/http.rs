use super::prompt::Prompt;
use super::{GenerationError, TextGenerator};
use serde_json::{json, Value};
use std::time::Duration;

/// Environment variable holding the Gemini API key
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default Gemini model for explanations
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash-lite";

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Text generator backed by the Gemini `generateContent` REST endpoint
pub struct GeminiGenerator {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiGenerator {
    /// Creates a generator for `model`
    ///
    /// `timeout` bounds the HTTP exchange; the explanation service applies
    /// its own timeout on top.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
        }
    }

    /// Creates a generator from `GEMINI_API_KEY`, `None` if it is unset or blank
    pub fn from_env(timeout: Duration) -> Option<Self> {
        let key = std::env::var(GEMINI_API_KEY_ENV).ok()?;
        if key.trim().is_empty() {
            return None;
        }
        Some(Self::new(key.trim(), DEFAULT_GEMINI_MODEL, timeout))
    }

    /// Builder: Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(prompt: &Prompt) -> Value {
        json!({
            "systemInstruction": { "parts": [{ "text": prompt.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
            "generationConfig": {
                "temperature": prompt.temperature,
                "maxOutputTokens": prompt.max_output_tokens,
            },
        })
    }
}

impl TextGenerator for GeminiGenerator {
    fn engine_name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let response = self
            .agent
            .post(&url)
            .set("x-goog-api-key", &self.api_key)
            .set("Content-Type", "application/json")
            .send_json(Self::request_body(prompt));

        match response {
            Ok(resp) => {
                let body: Value = resp
                    .into_json()
                    .map_err(|e| GenerationError::Transport(e.to_string()))?;
                Ok(response_text(&body))
            }
            Err(ureq::Error::Status(401, _)) | Err(ureq::Error::Status(403, _)) => Err(
                GenerationError::Unavailable("API key rejected".to_string()),
            ),
            Err(ureq::Error::Status(429, _)) => {
                Err(GenerationError::Unavailable("rate limited".to_string()))
            }
            Err(e) => Err(GenerationError::Transport(e.to_string())),
        }
    }
}

/// Concatenates the text parts of the first candidate
fn response_text(body: &Value) -> String {
    body["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p["text"].as_str())
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}
