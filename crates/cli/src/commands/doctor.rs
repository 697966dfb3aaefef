//! `synapse doctor`: Diagnose system health.

use synapse_config::AppConfig;
use synapse_core::interaction::InteractionStore;
use synapse_core::provider::Provider;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Synapse-V Doctor — System Diagnostics");
    println!("========================================\n");

    let mut issues = 0;

    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file — run `synapse onboard` (using defaults)");
        issues += 1;
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 blocking issue. Fix the config and re-run doctor.");
            return Ok(());
        }
    };

    if super::needs_api_key(&config) {
        println!("  ❌ No API key for '{}' — set GROQ_API_KEY or api_key", config.default_provider);
        issues += 1;
    } else {
        println!("  ✅ API key configured");
        let provider = synapse_providers::build_from_config(&config);
        match provider.health_check().await {
            Ok(true) => println!("  ✅ Provider '{}' reachable", provider.name()),
            Ok(false) | Err(_) => {
                println!("  ❌ Provider '{}' not reachable", provider.name());
                issues += 1;
            }
        }
    }

    match synapse_memory::open_store(&config.storage).await {
        Ok(store) => println!("  ✅ History store opens ({})", store.name()),
        Err(e) => {
            println!("  ❌ History store: {e}");
            issues += 1;
        }
    }

    let upload_dir = config.gateway.upload_dir();
    if upload_dir.is_dir() {
        println!("  ✅ Upload directory exists");
    } else {
        println!("  ⚠️  No upload directory — run `synapse onboard`");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
