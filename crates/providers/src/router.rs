//! Provider construction from configuration.
//!
//! The client and its credentials are built once at startup and passed
//! explicitly into the dispatcher.

use std::sync::Arc;

use synapse_config::AppConfig;
use synapse_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Build the configured provider.
///
/// Per-provider settings in `[providers.<name>]` win over the top-level key
/// and the well-known base URL.
pub fn build_from_config(config: &AppConfig) -> Arc<dyn Provider> {
    let name = config.default_provider.as_str();
    let provider_config = config.providers.get(name);

    let api_key = provider_config
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone())
        .unwrap_or_default();

    let base_url = provider_config
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));

    if api_key.is_empty() && name != "ollama" {
        tracing::warn!(provider = %name, "No API key configured; requests will be rejected");
    }

    Arc::new(OpenAiCompatProvider::new(name, base_url, api_key))
}

/// Get the default base URL for well-known OpenAI-compatible providers.
pub fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "groq" => "https://api.groq.com/openai/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}
