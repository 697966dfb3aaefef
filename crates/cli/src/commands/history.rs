//! `synapse history`: Inspect and prune saved interactions.

use synapse_config::AppConfig;
use synapse_core::interaction::{Interaction, InteractionStore};

pub async fn run(clear: bool, delete: Option<i64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = synapse_memory::open_store(&config.storage).await?;

    if clear {
        let removed = store.clear().await?;
        println!("🧹 Cleared {removed} interaction(s)");
        return Ok(());
    }

    if let Some(id) = delete {
        if store.delete(id).await? {
            println!("✅ Deleted interaction {id}");
        } else {
            println!("⚠️  No interaction with id {id}");
        }
        return Ok(());
    }

    let rows = store.list().await?;
    println!("📜 History ({} saved, {})", rows.len(), store.name());
    println!("====================");
    if rows.is_empty() {
        println!("   Nothing saved yet.");
    }
    for row in &rows {
        println!("{}", summary_line(row));
    }

    Ok(())
}

fn summary_line(row: &Interaction) -> String {
    let when = chrono::DateTime::parse_from_rfc3339(&row.timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%d %b, %H:%M").to_string())
        .unwrap_or_else(|_| row.timestamp.clone());
    let image = if row.image_path.is_some() { " 🖼" } else { "" };
    format!(
        "  {:>4}  {when}{image}\n        You: {}\n        AI:  {}",
        row.id,
        preview(&row.user_text, 70),
        preview(&row.ai_response, 70)
    )
}

/// First line, at most `max` chars.
fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() > max {
        format!("{}…", line.chars().take(max).collect::<String>())
    } else {
        line.to_string()
    }
}
