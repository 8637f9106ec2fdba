use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_sessions::Session;

use crate::uploads::UploadError;

use super::auth::get_session_user_id;
use super::{ApiError, ApiResponse, AppState, types};

/// Multipart form field carrying the uploaded file.
const UPLOAD_FIELD: &str = "document";

// ============================================================================
// Submissions
// ============================================================================

/// POST /documents
/// Upload a document (multipart form, field `document`)
pub async fn upload(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<types::UploadResultDto>>, ApiError> {
    let user_id = get_session_user_id(&session).await?;

    let mut original_name: Option<String> = None;
    let mut payload: Option<axum::body::Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Invalid upload request: {e}")))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            original_name = field.file_name().map(String::from);
            payload = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Could not read upload: {e}")))?,
            );
        }
    }

    let Some(payload) = payload else {
        return Err(UploadError::NoFile.into());
    };
    let original_name = original_name.unwrap_or_default();

    let stored = state
        .uploads
        .save_upload(user_id, &original_name, &payload)
        .await?;

    Ok(Json(ApiResponse::success(types::UploadResultDto::from(
        stored,
    ))))
}

/// GET /documents
/// List the current user's submissions, newest first
pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<types::DocumentDto>>>, ApiError> {
    let user_id = get_session_user_id(&session).await?;

    let documents = state
        .store
        .list_documents_for_user(user_id)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    Ok(Json(ApiResponse::success(
        documents.into_iter().map(types::DocumentDto::from).collect(),
    )))
}

/// GET /documents/{stored_filename}/download
/// Serve an owned submission under its original display name.
pub async fn download(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(stored_filename): Path<String>,
) -> Result<Response, ApiError> {
    let user_id = get_session_user_id(&session).await?;

    let document = state
        .store
        .get_document_by_stored_filename(&stored_filename)
        .await
        .map_err(|e| ApiError::DatabaseError(e.to_string()))?;

    // Missing document and foreign ownership get the same answer.
    let document = match document {
        Some(doc) if doc.user_id == user_id => doc,
        _ => {
            tracing::warn!(
                "Denied download of {stored_filename} for user {user_id}"
            );
            return Err(ApiError::document_not_found());
        }
    };

    // Path resolution only ever uses the stored name from the record,
    // never the uploader-supplied display name.
    let upload_dir = state.config.read().await.uploads.upload_dir.clone();
    let path = PathBuf::from(upload_dir).join(&document.stored_filename);

    let contents = match tokio::fs::read(&path).await {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!(
                "Document {} missing on disk at {}: {e}",
                document.id,
                path.display()
            );
            return Err(ApiError::document_not_found());
        }
    };

    Ok(serve_attachment(
        &document.stored_filename,
        &document.original_name,
        contents,
    ))
}

// ============================================================================
// Template downloads (public)
// ============================================================================

/// GET /templates
/// List template documents available for download
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<types::TemplateFileDto>>>, ApiError> {
    let template_dir = state.config.read().await.uploads.template_dir.clone();

    let mut templates = Vec::new();
    let mut entries = match tokio::fs::read_dir(&template_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!("Error listing template files from {template_dir}: {e}");
            return Ok(Json(ApiResponse::success(templates)));
        }
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Ok(metadata) = entry.metadata().await
            && metadata.is_file()
            && let Ok(name) = entry.file_name().into_string()
        {
            templates.push(types::TemplateFileDto {
                name,
                size: i64::try_from(metadata.len()).unwrap_or(i64::MAX),
            });
        }
    }

    templates.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(ApiResponse::success(templates)))
}

/// GET /templates/{filename}
/// Download a template document by exact name. Public by design.
pub async fn download_template(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    // Exact-name match only; anything that could walk out of the template
    // directory is rejected before touching the filesystem.
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains('\0')
        || filename.contains("..")
    {
        return Err(ApiError::validation("Invalid template name"));
    }

    let template_dir = state.config.read().await.uploads.template_dir.clone();
    let path = PathBuf::from(template_dir).join(&filename);

    if !path.is_file() {
        tracing::warn!("Attempted download of non-existent template: {filename}");
        return Err(ApiError::NotFound(format!(
            "Template file not found: {filename}"
        )));
    }

    let contents = tokio::fs::read(&path).await.map_err(|e| {
        tracing::error!("Error serving template file {filename}: {e}");
        ApiError::StorageError(e.to_string())
    })?;

    Ok(serve_attachment(&filename, &filename, contents))
}

// ============================================================================
// Helpers
// ============================================================================

/// Build an attachment response. Content type comes from the on-disk name;
/// quotes and control characters are stripped from the display name before
/// it goes into the header.
fn serve_attachment(stored_name: &str, display_name: &str, contents: Vec<u8>) -> Response {
    let content_type = mime_guess::from_path(stored_name)
        .first_or_octet_stream()
        .to_string();

    let safe_display: String = display_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();

    (
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{safe_display}\""),
            ),
        ],
        Body::from(contents),
    )
        .into_response()
}
