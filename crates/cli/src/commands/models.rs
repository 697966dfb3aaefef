//! `synapse models`: List models the provider offers.

use synapse_config::AppConfig;
use synapse_core::provider::Provider;

pub async fn run(vision_only: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    super::require_api_key(&config)?;

    let provider = synapse_providers::build_from_config(&config);
    let models = provider
        .list_models()
        .await
        .map_err(|e| format!("Failed to list models from {}: {e}", config.default_provider))?;

    let shown = filter_models(models, vision_only);
    let configured = |id: &str| {
        [&config.models.vision, &config.models.fast, &config.models.quality]
            .iter()
            .any(|chain| chain.iter().any(|m| m == id))
    };

    println!(
        "🤖 {} models from {}",
        if vision_only { "Vision" } else { "Available" },
        config.default_provider
    );
    println!("==========================");
    if shown.is_empty() {
        println!("   (none)");
    }
    for id in &shown {
        let marker = if configured(id) { "★" } else { " " };
        println!("  {marker} {id}");
    }
    println!("\n  ★ = used by a configured fallback chain");

    Ok(())
}

/// Sorted ids, optionally only those whose id mentions "vision".
fn filter_models(mut models: Vec<String>, vision_only: bool) -> Vec<String> {
    if vision_only {
        models.retain(|id| id.to_ascii_lowercase().contains("vision"));
    }
    models.sort();
    models
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vision_filter_and_sort() {
        let models = vec![
            "llama-3.3-70b-versatile".to_string(),
            "llama-3.2-90b-vision-preview".to_string(),
            "llama-3.2-11b-Vision-preview".to_string(),
        ];
        assert_eq!(
            filter_models(models.clone(), true),
            vec!["llama-3.2-11b-Vision-preview", "llama-3.2-90b-vision-preview"]
        );
        assert_eq!(filter_models(models, false).len(), 3);
    }
}
