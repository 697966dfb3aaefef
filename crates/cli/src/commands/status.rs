//! `synapse status`: Show effective configuration.

use synapse_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    println!("🧠 Synapse-V Status");
    println!("===================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Assistant:    {} ({})", config.assistant.name, config.assistant.region);
    println!("  Provider:     {}", config.default_provider);
    println!("  Temperature:  {}", config.default_temperature);
    println!("  Vision:       {}", config.models.vision.join(" → "));
    println!("  Fast:         {}", config.models.fast.join(" → "));
    println!("  Quality:      {}", config.models.quality.join(" → "));
    println!("  Personas:     {}", config.personas.names().collect::<Vec<_>>().join(", "));
    println!("  Storage:      {} ({})", config.storage.backend, config.storage.database_path().display());
    println!("  Auto-save:    {}", if config.storage.auto_save { "on" } else { "off" });
    println!("  Gateway:      {}:{}", config.gateway.host, config.gateway.port);
    println!("  Uploads:      {}", config.gateway.upload_dir().display());
    println!("  Doc limit:    {} chars", config.context.max_document_chars);

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `synapse onboard` first");
    }

    Ok(())
}
