use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::documents;

pub mod migrator;
pub mod repositories;

pub use repositories::document::NewDocument;
pub use repositories::user::{NewUser, User};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains("memory") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    // ========== User Repository Methods ==========

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn user_exists(&self, username: &str, email: &str) -> Result<bool> {
        self.user_repo().exists(username, email).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User, sea_orm::DbErr> {
        self.user_repo().create(new_user).await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<bool> {
        self.user_repo().verify_password(username, password).await
    }

    // ========== Document Repository Methods ==========

    #[must_use]
    pub fn document_repo(&self) -> repositories::document::DocumentRepository {
        repositories::document::DocumentRepository::new(self.conn.clone())
    }

    pub async fn insert_document(&self, doc: NewDocument) -> Result<documents::Model> {
        self.document_repo().insert(doc).await
    }

    pub async fn get_document(&self, id: i32) -> Result<Option<documents::Model>> {
        self.document_repo().get_by_id(id).await
    }

    pub async fn get_document_by_stored_filename(
        &self,
        name: &str,
    ) -> Result<Option<documents::Model>> {
        self.document_repo().get_by_stored_filename(name).await
    }

    pub async fn list_documents_for_user(&self, user_id: i32) -> Result<Vec<documents::Model>> {
        self.document_repo().list_for_user(user_id).await
    }

    pub async fn list_all_documents(&self) -> Result<Vec<documents::Model>> {
        self.document_repo().list_all().await
    }

    pub async fn count_documents(&self) -> Result<u64> {
        self.document_repo().count().await
    }

    pub async fn update_document_status(&self, id: i32, status: &str) -> Result<bool> {
        self.document_repo().update_status(id, status).await
    }
}
