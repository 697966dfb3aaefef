//! SQLite interaction store.
//!
//! One flat table, created on open:
//! - `interactions`: `id`, `timestamp`, `user_text`, `ai_response`,
//!   `audio_url`, `image_path`

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Row, SqlitePool};
use synapse_core::error::StoreError;
use synapse_core::interaction::{Interaction, InteractionStore, InteractionUpdate, NewInteraction};
use tracing::{debug, info};

pub struct SqliteInteractionStore {
    pool: SqlitePool,
}

impl SqliteInteractionStore {
    /// Open (or create) a store from a connection string or file path.
    ///
    /// Pass `"sqlite::memory:"` for an ephemeral database (useful for tests).
    pub async fn new(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?;
        Self::connect(options, is_memory(url)).await
    }

    /// Open (or create) the database file at `path`, creating parent directories.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Storage(format!("Failed to create {}: {e}", parent.display())))?;
        }
        let store = Self::connect(SqliteConnectOptions::new().filename(path), false).await?;
        info!(path = %path.display(), "SQLite interaction store opened");
        Ok(store)
    }

    async fn connect(options: SqliteConnectOptions, in_memory: bool) -> Result<Self, StoreError> {
        let options = options
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        // Each connection to `:memory:` is its own database, so keep exactly one alive.
        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS interactions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp    TEXT NOT NULL,
                user_text    TEXT NOT NULL,
                ai_response  TEXT NOT NULL,
                audio_url    TEXT,
                image_path   TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("interactions table: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn row_to_interaction(row: &SqliteRow) -> Result<Interaction, StoreError> {
        let column = |name: &str, e: sqlx::Error| StoreError::QueryFailed(format!("{name} column: {e}"));

        Ok(Interaction {
            id: row.try_get("id").map_err(|e| column("id", e))?,
            timestamp: row.try_get("timestamp").map_err(|e| column("timestamp", e))?,
            user_text: row.try_get("user_text").map_err(|e| column("user_text", e))?,
            ai_response: row
                .try_get("ai_response")
                .map_err(|e| column("ai_response", e))?,
            audio_url: row.try_get("audio_url").map_err(|e| column("audio_url", e))?,
            image_path: row
                .try_get("image_path")
                .map_err(|e| column("image_path", e))?,
        })
    }
}

fn is_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

#[async_trait]
impl InteractionStore for SqliteInteractionStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn save(&self, interaction: NewInteraction) -> Result<i64, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO interactions (timestamp, user_text, ai_response, audio_url, image_path)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(Utc::now().to_rfc3339())
        .bind(&interaction.user_text)
        .bind(&interaction.ai_response)
        .bind(&interaction.audio_url)
        .bind(&interaction.image_path)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT failed: {e}")))?;

        let id = result.last_insert_rowid();
        debug!(id, "Saved interaction");
        Ok(id)
    }

    async fn update(&self, id: i64, update: InteractionUpdate) -> Result<Option<i64>, StoreError> {
        let result = sqlx::query(
            "UPDATE interactions SET user_text = ?1, ai_response = ?2, audio_url = ?3 WHERE id = ?4",
        )
        .bind(&update.user_text)
        .bind(&update.ai_response)
        .bind(&update.audio_url)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPDATE failed: {e}")))?;

        Ok((result.rows_affected() > 0).then_some(id))
    }

    async fn get(&self, id: i64) -> Result<Option<Interaction>, StoreError> {
        let row = sqlx::query("SELECT * FROM interactions WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("GET failed: {e}")))?;

        row.as_ref().map(Self::row_to_interaction).transpose()
    }

    async fn list(&self) -> Result<Vec<Interaction>, StoreError> {
        let rows = sqlx::query("SELECT * FROM interactions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("LIST failed: {e}")))?;

        rows.iter().map(Self::row_to_interaction).collect()
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM interactions WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("DELETE failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let result = sqlx::query("DELETE FROM interactions")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Storage(format!("CLEAR failed: {e}")))?;

        Ok(result.rows_affected() as usize)
    }
}
