use serde::{Deserialize, Serialize};

use crate::entities::documents;
use crate::services::AuthenticatedUser;
use crate::uploads::StoredDocument;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserDto {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<AuthenticatedUser> for UserDto {
    fn from(user: AuthenticatedUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentDto {
    pub id: i32,
    pub user_id: i32,
    pub stored_filename: String,
    pub original_name: String,
    pub upload_date: String,
    pub status: String,
    pub file_size: i64,
}

impl From<documents::Model> for DocumentDto {
    fn from(model: documents::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            stored_filename: model.stored_filename,
            original_name: model.original_name,
            upload_date: model.upload_date,
            status: model.status,
            file_size: model.file_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResultDto {
    pub id: i32,
    pub stored_filename: String,
    pub original_name: String,
    pub file_size: i64,
    pub status: String,
}

impl From<StoredDocument> for UploadResultDto {
    fn from(doc: StoredDocument) -> Self {
        Self {
            id: doc.id,
            stored_filename: doc.stored_filename,
            original_name: doc.original_name,
            file_size: doc.file_size,
            status: doc.status,
        }
    }
}

/// A template document available for public download.
#[derive(Debug, Serialize)]
pub struct TemplateFileDto {
    pub name: String,
    pub size: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequestDto {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusUpdateDto {
    pub document_id: i32,
    pub status: String,
    pub notified: bool,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub total_documents: u64,
}
