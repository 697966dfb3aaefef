//! Interaction history endpoints.
//!
//! - `GET    /history`:       all interactions, oldest first
//! - `POST   /history`:       save one interaction
//! - `PUT    /history/{id}`:  correct a stored interaction
//! - `DELETE /history/{id}`:  delete one interaction
//! - `DELETE /clear_history`: delete everything

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use synapse_core::interaction::{Interaction, InteractionUpdate, NewInteraction};
use tracing::info;

use crate::{ApiError, SharedState, StatusResponse};

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub id: i64,
}

pub async fn list_history_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<Interaction>>, ApiError> {
    let rows = state.store.list().await.map_err(ApiError::from_store)?;
    Ok(Json(rows))
}

pub async fn save_history_handler(
    State(state): State<SharedState>,
    Json(interaction): Json<NewInteraction>,
) -> Result<Json<SavedResponse>, ApiError> {
    let id = state
        .store
        .save(interaction)
        .await
        .map_err(ApiError::from_store)?;
    info!(id, "Interaction saved via API");
    Ok(Json(SavedResponse { id }))
}

pub async fn update_history_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(update): Json<InteractionUpdate>,
) -> Result<Json<SavedResponse>, ApiError> {
    match state
        .store
        .update(id, update)
        .await
        .map_err(ApiError::from_store)?
    {
        Some(id) => Ok(Json(SavedResponse { id })),
        None => Err(ApiError::not_found(format!("Interaction {id} not found"))),
    }
}

pub async fn delete_history_handler(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> Result<Json<StatusResponse>, ApiError> {
    if state.store.delete(id).await.map_err(ApiError::from_store)? {
        Ok(Json(StatusResponse::new("deleted")))
    } else {
        Err(ApiError::not_found(format!("Interaction {id} not found")))
    }
}

pub async fn clear_history_handler(
    State(state): State<SharedState>,
) -> Result<Json<StatusResponse>, ApiError> {
    let removed = state.store.clear().await.map_err(ApiError::from_store)?;
    info!(removed, "History cleared");
    Ok(Json(StatusResponse::new("ok")))
}
