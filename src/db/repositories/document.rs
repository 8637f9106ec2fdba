use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::documents;

/// Fields for a new document record. Timestamps and ids are assigned here.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub user_id: i32,
    pub stored_filename: String,
    pub original_name: String,
    pub status: String,
    pub file_size: i64,
}

pub struct DocumentRepository {
    conn: DatabaseConnection,
}

impl DocumentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Insert a document record, returning the stored row.
    pub async fn insert(&self, doc: NewDocument) -> Result<documents::Model> {
        let now = chrono::Utc::now().to_rfc3339();

        let model = documents::ActiveModel {
            user_id: Set(doc.user_id),
            stored_filename: Set(doc.stored_filename),
            original_name: Set(doc.original_name),
            upload_date: Set(now),
            status: Set(doc.status),
            file_size: Set(doc.file_size),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert document record")?;

        Ok(model)
    }

    /// Get document by ID
    pub async fn get_by_id(&self, id: i32) -> Result<Option<documents::Model>> {
        let doc = documents::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query document by ID")?;

        Ok(doc)
    }

    /// Get a document by its stored on-disk filename
    pub async fn get_by_stored_filename(&self, name: &str) -> Result<Option<documents::Model>> {
        let doc = documents::Entity::find()
            .filter(documents::Column::StoredFilename.eq(name))
            .one(&self.conn)
            .await
            .context("Failed to query document by stored filename")?;

        Ok(doc)
    }

    /// All documents owned by a user, newest upload first
    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<documents::Model>> {
        let docs = documents::Entity::find()
            .filter(documents::Column::UserId.eq(user_id))
            .order_by_desc(documents::Column::UploadDate)
            .all(&self.conn)
            .await
            .context("Failed to list documents for user")?;

        Ok(docs)
    }

    /// All documents across all users, newest upload first
    pub async fn list_all(&self) -> Result<Vec<documents::Model>> {
        let docs = documents::Entity::find()
            .order_by_desc(documents::Column::UploadDate)
            .all(&self.conn)
            .await
            .context("Failed to list documents")?;

        Ok(docs)
    }

    /// Total number of submissions across all users
    pub async fn count(&self) -> Result<u64> {
        let count = documents::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count documents")?;

        Ok(count)
    }

    /// Update a document's status. Returns false when no row matched.
    pub async fn update_status(&self, id: i32, status: &str) -> Result<bool> {
        let result = documents::Entity::update_many()
            .col_expr(
                documents::Column::Status,
                sea_orm::sea_query::Expr::value(status),
            )
            .filter(documents::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update document status")?;

        Ok(result.rows_affected > 0)
    }
}
