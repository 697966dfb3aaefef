//! Upload explorer endpoints.
//!
//! - `GET    /list_files`:             uploads grouped into images, documents, audio
//! - `DELETE /delete_file/{filename}`: remove one upload

use axum::{
    extract::{Path, State},
    response::Json,
};
use tracing::info;

use crate::uploads::FileListing;
use crate::{ApiError, SharedState, StatusResponse};

pub async fn list_files_handler(
    State(state): State<SharedState>,
) -> Result<Json<FileListing>, ApiError> {
    let listing = state
        .uploads
        .list()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to list uploads: {e}")))?;
    Ok(Json(listing))
}

/// Always answers 200; a missing or unacceptable name reports
/// `{"status":"error","message":"File not found"}`.
pub async fn delete_file_handler(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let removed = state
        .uploads
        .delete(&filename)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to delete {filename}: {e}")))?;

    if removed {
        info!(file = %filename, "Upload deleted");
        Ok(Json(StatusResponse::new("deleted")))
    } else {
        Ok(Json(StatusResponse::error("File not found")))
    }
}
