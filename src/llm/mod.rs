//! Ollama-backed text capability for enrichment.
//!
//! The LLM is used **only** to populate derived fields after entity
//! creation: item summaries and review sentiment. The recommendation path
//! never touches it — ranking works purely on already-enriched text.
//!
//! `TextCapability` is the seam: the enrichment worker holds a trait object,
//! so tests substitute a scripted capability and production wires in
//! `OllamaClient`.

use miette::Diagnostic;
use thiserror::Error;

use crate::model::Sentiment;

/// Maximum number of characters of raw source text sent to the summarizer.
pub const SUMMARY_INPUT_CAP: usize = 2000;

/// Errors from the LLM subsystem.
#[derive(Debug, Error, Diagnostic)]
pub enum LlmError {
    #[error("Ollama is not available at {url}")]
    #[diagnostic(
        code(lumina::llm::unavailable),
        help("Start Ollama with `ollama serve`, or point `ollama.base_url` at a running instance.")
    )]
    Unavailable { url: String },

    #[error("Ollama request failed: {message}")]
    #[diagnostic(
        code(lumina::llm::request_failed),
        help("Check that Ollama is running and the model is pulled.")
    )]
    RequestFailed { message: String },

    #[error("failed to parse Ollama response: {message}")]
    #[diagnostic(
        code(lumina::llm::parse_error),
        help("The model returned an unexpected response format.")
    )]
    ParseError { message: String },

    #[error("Ollama request timed out after {timeout_secs}s")]
    #[diagnostic(
        code(lumina::llm::timeout),
        help("Increase `ollama.timeout_secs` or use a smaller model.")
    )]
    Timeout { timeout_secs: u64 },
}

/// Capability contract for text generation and classification.
///
/// Implementations must return a bounded error rather than hanging: the
/// enrichment worker treats any `Err` as a failed attempt and applies its
/// retry policy.
pub trait TextCapability: Send + Sync {
    /// Produce a short natural-language summary of the given raw text.
    ///
    /// Implementations only receive the first [`SUMMARY_INPUT_CAP`]
    /// characters; the worker truncates before calling.
    fn summarize(&self, text: &str) -> Result<String, LlmError>;

    /// Classify the sentiment of a review comment.
    fn classify_sentiment(&self, review_text: &str) -> Result<Sentiment, LlmError>;
}

/// Normalize a raw model response to a sentiment label.
///
/// Case-insensitive substring match; anything ambiguous becomes `Neutral`.
pub fn normalize_sentiment(raw: &str) -> Sentiment {
    let lower = raw.to_lowercase();
    if lower.contains("positive") {
        Sentiment::Positive
    } else if lower.contains("negative") {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Configuration for the Ollama client.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Model name to use.
    pub model: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".into(),
            model: "tinyllama".into(),
            timeout_secs: 120,
        }
    }
}

/// Client for the Ollama REST API.
pub struct OllamaClient {
    config: OllamaConfig,
}

impl OllamaClient {
    /// Create a new Ollama client with the given configuration.
    pub fn new(config: OllamaConfig) -> Self {
        Self { config }
    }

    /// Probe the Ollama server to check availability.
    ///
    /// Sends a lightweight request to the `/api/tags` endpoint.
    pub fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(5))
            .build();
        matches!(agent.get(&url).call(), Ok(resp) if resp.status() == 200)
    }

    /// The model name being used.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Generate a completion from a prompt via `/api/generate`.
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(self.config.timeout_secs))
            .build();

        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": prompt,
            "stream": false,
        });

        let body_str = serde_json::to_string(&body).map_err(|e| LlmError::RequestFailed {
            message: format!("JSON serialize error: {e}"),
        })?;

        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(&body_str)
            .map_err(|e: ureq::Error| match e {
                ureq::Error::Transport(t)
                    if t.kind() == ureq::ErrorKind::ConnectionFailed
                        || t.kind() == ureq::ErrorKind::Dns =>
                {
                    LlmError::Unavailable {
                        url: self.config.base_url.clone(),
                    }
                }
                ureq::Error::Transport(t)
                    if t.kind() == ureq::ErrorKind::Io
                        && t.to_string().contains("timed out") =>
                {
                    LlmError::Timeout {
                        timeout_secs: self.config.timeout_secs,
                    }
                }
                other => LlmError::RequestFailed {
                    message: other.to_string(),
                },
            })?;

        let resp_str = resp.into_string().map_err(|e| LlmError::ParseError {
            message: e.to_string(),
        })?;

        let json: serde_json::Value =
            serde_json::from_str(&resp_str).map_err(|e| LlmError::ParseError {
                message: e.to_string(),
            })?;

        json["response"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| LlmError::ParseError {
                message: "missing 'response' field".into(),
            })
    }
}

impl TextCapability for OllamaClient {
    fn summarize(&self, text: &str) -> Result<String, LlmError> {
        let prompt = format!("Summarize this in 3 sentences: {text}");
        self.generate(&prompt)
    }

    fn classify_sentiment(&self, review_text: &str) -> Result<Sentiment, LlmError> {
        let prompt = format!(
            "Analyze the sentiment of the following book review. \
             Reply with ONLY one word: 'Positive', 'Negative', or 'Neutral'.\n\n\
             Review: {review_text}"
        );
        Ok(normalize_sentiment(&self.generate(&prompt)?))
    }
}

impl std::fmt::Debug for OllamaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OllamaClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish()
    }
}
