use axum::{
    Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, types};

/// GET /admin/documents
/// List all submissions across users (admin only)
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<types::DocumentDto>>>, ApiError> {
    let documents = state
        .store
        .list_all_documents()
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        documents.into_iter().map(types::DocumentDto::from).collect(),
    )))
}

/// PUT /admin/documents/{id}/status
/// Update a submission's review status and notify its owner.
///
/// The notification is best-effort: a mail failure never fails the update.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<types::StatusUpdateRequest>,
) -> Result<Json<ApiResponse<types::StatusUpdateDto>>, ApiError> {
    let outcome = state
        .review
        .update_status(id, &payload.status, &payload.message)
        .await?;

    Ok(Json(ApiResponse::success(types::StatusUpdateDto {
        document_id: outcome.document_id,
        status: outcome.status,
        notified: outcome.notified,
    })))
}
