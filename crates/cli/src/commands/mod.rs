pub mod chat;
pub mod doctor;
pub mod history;
pub mod models;
pub mod onboard;
pub mod serve;
pub mod status;

use synapse_config::AppConfig;

/// Providers that run locally and accept unauthenticated requests.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "vllm"];

pub(crate) fn needs_api_key(config: &AppConfig) -> bool {
    !config.has_api_key() && !KEYLESS_PROVIDERS.contains(&config.default_provider.as_str())
}

/// Fail early with setup instructions when no key is available.
pub(crate) fn require_api_key(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !needs_api_key(config) {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: No API key configured for '{}'!", config.default_provider);
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    export GROQ_API_KEY='gsk_...'      (default provider)");
    eprintln!("    export OPENAI_API_KEY='sk-...'     (OpenAI direct)");
    eprintln!("    export SYNAPSE_API_KEY='...'       (generic)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    Err("No API key found. See above for setup instructions.".into())
}
