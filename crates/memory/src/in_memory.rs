//! In-memory store: useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::Utc;
use synapse_core::error::StoreError;
use synapse_core::interaction::{Interaction, InteractionStore, InteractionUpdate, NewInteraction};
use tokio::sync::RwLock;

#[derive(Default)]
struct Rows {
    next_id: i64,
    rows: Vec<Interaction>,
}

/// Keeps interactions in a `Vec`, ids assigned like an autoincrement column.
#[derive(Default)]
pub struct InMemoryInteractionStore {
    inner: RwLock<Rows>,
}

impl InMemoryInteractionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InteractionStore for InMemoryInteractionStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, interaction: NewInteraction) -> Result<i64, StoreError> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.rows.push(Interaction {
            id,
            timestamp: Utc::now().to_rfc3339(),
            user_text: interaction.user_text,
            ai_response: interaction.ai_response,
            audio_url: interaction.audio_url,
            image_path: interaction.image_path,
        });
        Ok(id)
    }

    async fn update(&self, id: i64, update: InteractionUpdate) -> Result<Option<i64>, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.rows.iter_mut().find(|r| r.id == id).map(|row| {
            row.user_text = update.user_text;
            row.ai_response = update.ai_response;
            row.audio_url = update.audio_url;
            id
        }))
    }

    async fn get(&self, id: i64) -> Result<Option<Interaction>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.rows.iter().find(|r| r.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<Interaction>, StoreError> {
        Ok(self.inner.read().await.rows.clone())
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.rows.len();
        inner.rows.retain(|r| r.id != id);
        Ok(inner.rows.len() < before)
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let removed = inner.rows.len();
        inner.rows.clear();
        Ok(removed)
    }
}
