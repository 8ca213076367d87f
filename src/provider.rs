//! Optional text-generation provider for sleep advice
//!
//! The advisor can ask an external language model to phrase advice. The
//! provider is strictly optional: every failure is converted into a
//! [`ProviderReply::Failed`] so callers fall back to the built-in rules.
//!
//! ## Configuration
//!
//! [`GeminiProvider`] reads its API key from the environment variable named
//! in the `[advisor]` config section (`GEMINI_API_KEY` by default).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::error::ProviderError;

/// Default model for the Gemini provider
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Base URL for the Generative Language API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default upper bound on a single provider request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of free-form advice text
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Generate text for a prompt
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Outcome of asking a provider for text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderReply {
    Text(String),
    Failed(String),
}

impl ProviderReply {
    pub fn is_text(&self) -> bool {
        matches!(self, ProviderReply::Text(_))
    }
}

/// Ask `provider` for text, bounded by `timeout`.
///
/// Never returns an error: transport failures, bad statuses, malformed
/// bodies, empty text and timeouts all become [`ProviderReply::Failed`].
/// No retry is attempted.
pub async fn request_text(
    provider: &dyn AdviceProvider,
    prompt: &str,
    timeout: Duration,
) -> ProviderReply {
    match tokio::time::timeout(timeout, provider.generate_text(prompt)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => ProviderReply::Text(text.trim().to_string()),
        Ok(Ok(_)) => ProviderReply::Failed(
            ProviderError::MalformedResponse("empty text".to_string()).to_string(),
        ),
        Ok(Err(err)) => ProviderReply::Failed(err.to_string()),
        Err(_) => ProviderReply::Failed(ProviderError::Timeout(timeout).to_string()),
    }
}

// ============================================================================
// Gemini API types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

// ============================================================================
// Provider implementation
// ============================================================================

/// Google Gemini `generateContent` provider
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    model: String,
    base_url: String,
}

impl Debug for GeminiProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl GeminiProvider {
    /// Create a provider with an API key and request timeout
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured("empty API key".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key,
            client,
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    /// Create a provider from the API key in environment variable `var`
    pub fn from_env(var: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let api_key = std::env::var(var)
            .map_err(|_| {
                ProviderError::NotConfigured(format!("{var} environment variable not set"))
            })?;
        Self::new(api_key, timeout)
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    /// Extract the first candidate's text from a response body
    fn parse_response(body: &str) -> Result<String, ProviderError> {
        let response: GenerateResponse = serde_json::from_str(body)
            .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {e}")))?;

        if let Some(error) = response.error {
            return Err(ProviderError::MalformedResponse(error.message));
        }

        response
            .candidates
            .and_then(|candidates| candidates.into_iter().next())
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().find_map(|part| part.text))
            .ok_or_else(|| {
                let path = "candidates[0].content.parts[0].text";
                ProviderError::MalformedResponse(format!("missing {path}"))
            })
    }
}

#[async_trait]
impl AdviceProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    #[instrument(skip(self, prompt), fields(model = %self.model))]
    async fn generate_text(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        debug!(prompt_chars = prompt.len(), "Sending request to Gemini API");

        let response = self
            .client
            .post(self.build_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Transport("request timed out".to_string())
                } else {
                    ProviderError::Transport(e.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            warn!(status = %status, "Gemini API returned an error status");
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Self::parse_response(&body)
    }
}
