//! `synapse serve`: Start the HTTP gateway.

use synapse_config::AppConfig;

pub async fn run(port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    super::require_api_key(&config)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("🧠 Synapse-V Gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   Uploads:   {}", config.gateway.upload_dir().display());
    println!("   Auth:      {}", if config.gateway.api_token.is_some() { "bearer token" } else { "none" });

    synapse_gateway::start(config).await?;

    Ok(())
}
