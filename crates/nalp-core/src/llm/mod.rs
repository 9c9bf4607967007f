//! Language model client
//!
//! A narrow request/response seam: one prompt in, one text body out. The
//! shipped implementation talks to the Gemini REST API.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod error;
mod gemini;

pub use error::LlmError;
pub use gemini::GeminiClient;

/// A single generation request
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Fully rendered prompt
    pub prompt: String,

    /// Sampling temperature; `None` uses the provider default
    pub temperature: Option<f32>,

    /// Ask the provider for a JSON body (`application/json` response type)
    pub json_output: bool,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            json_output: false,
        }
    }

    pub fn json(prompt: impl Into<String>) -> Self {
        Self {
            json_output: true,
            ..Self::text(prompt)
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Stateless model client; each call is independent
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier reported by the health endpoint
    fn model_id(&self) -> &str;

    /// Whether credentials are present. Callers check this before doing
    /// other work so a missing key fails fast.
    fn is_configured(&self) -> bool {
        true
    }

    /// Send one prompt and return the response text
    async fn generate(&self, request: GenerateRequest) -> Result<String, LlmError>;
}

// Compile-time assertion: LanguageModel must be object-safe.
const _: () = {
    fn _assert_object_safe(_: &dyn LanguageModel) {}
};

/// Model client configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name (e.g. `gemini-2.5-flash`)
    pub name: String,

    /// API base URL
    pub base_url: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Sampling temperature for clarifying questions
    pub question_temperature: f32,

    /// Extra attempts for plan synthesis after a transient model error
    pub plan_retries: u32,
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 120,
            question_temperature: 0.9,
            plan_retries: 1,
        }
    }
}
