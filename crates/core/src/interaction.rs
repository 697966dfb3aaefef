//! Interaction store trait: persistence of finished prompt/response pairs.
//!
//! The pipeline never reads from the store. Callers submit a completed
//! exchange after streaming has finished and get back an opaque id.
//! Rows are flat: no relationships beyond identity.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A persisted prompt/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: i64,

    /// RFC 3339 creation time
    pub timestamp: String,

    pub user_text: String,

    pub ai_response: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// The fields a caller supplies when saving an interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInteraction {
    pub user_text: String,
    pub ai_response: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
}

impl NewInteraction {
    pub fn new(user_text: impl Into<String>, ai_response: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            ai_response: ai_response.into(),
            audio_url: None,
            image_path: None,
        }
    }

    pub fn with_image_path(mut self, path: Option<String>) -> Self {
        self.image_path = path;
        self
    }
}

/// An explicit correction of a stored interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InteractionUpdate {
    pub user_text: String,
    pub ai_response: String,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// The persistence contract.
///
/// Implementations: SQLite, in-memory (for tests and `storage.backend = "memory"`).
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// The backend name (e.g., "sqlite", "memory").
    fn name(&self) -> &str;

    /// Persist a new interaction and return its id.
    async fn save(&self, interaction: NewInteraction) -> Result<i64, StoreError>;

    /// Overwrite the text fields of an existing row. `Ok(None)` if it does not exist.
    async fn update(&self, id: i64, update: InteractionUpdate) -> Result<Option<i64>, StoreError>;

    /// Fetch one interaction.
    async fn get(&self, id: i64) -> Result<Option<Interaction>, StoreError>;

    /// All interactions in insertion order.
    async fn list(&self) -> Result<Vec<Interaction>, StoreError>;

    /// Delete one interaction. Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool, StoreError>;

    /// Delete everything. Returns the number of rows removed.
    async fn clear(&self) -> Result<usize, StoreError>;
}
