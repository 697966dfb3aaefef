//! Provider trait: the abstraction over hosted LLM backends.
//!
//! A Provider knows how to send a conversation to a model and get a response
//! back as a stream of content fragments.
//!
//! Implementations: OpenAI-compatible endpoints (Groq, OpenAI, OpenRouter, ...).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::message::ChatMessage;

/// The receiving half of a provider stream.
///
/// Finite and not restartable: it ends when the upstream signals completion,
/// or yields one `Err` when the connection fails mid-way.
pub type ProviderStream = tokio::sync::mpsc::Receiver<Result<StreamChunk, ProviderError>>;

/// Configuration for a provider request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// The model identifier (e.g., "llama-3.3-70b-versatile")
    pub model: String,

    /// The conversation messages, system prompt first
    pub messages: Vec<ChatMessage>,

    /// Sampling temperature; `None` leaves the provider default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ProviderRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// The same request addressed to a different model.
    pub fn for_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta
    #[serde(default)]
    pub content: Option<String>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A content delta.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            done: false,
            usage: None,
        }
    }

    /// The terminal chunk.
    pub fn finished(usage: Option<Usage>) -> Self {
        Self {
            content: None,
            done: true,
            usage,
        }
    }
}

/// The core Provider trait.
///
/// `stream()` resolving to `Ok` means the backend *accepted* the request; the
/// stream itself may still fail later.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "groq").
    fn name(&self) -> &str;

    /// Submit a streaming completion request.
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, ProviderError>;

    /// List available models for this provider.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_request_defaults() {
        let req = ProviderRequest::new("llama-3.1-8b-instant", vec![ChatMessage::user("hi")]);
        assert!(req.temperature.is_none());
        assert!(req.max_tokens.is_none());
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn for_model_keeps_messages() {
        let req = ProviderRequest::new("a", vec![ChatMessage::user("hi")]);
        let other = req.for_model("b");
        assert_eq!(other.model, "b");
        assert_eq!(other.messages, req.messages);
    }

    #[test]
    fn stream_chunk_constructors() {
        let chunk = StreamChunk::text("Hel");
        assert_eq!(chunk.content.as_deref(), Some("Hel"));
        assert!(!chunk.done);
        assert!(StreamChunk::finished(None).done);
    }
}
