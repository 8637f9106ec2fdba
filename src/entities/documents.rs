use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "documents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning user. A weak reference, not a foreign-key cascade.
    pub user_id: i32,

    /// Sanitized, collision-free name on disk. The only value ever used
    /// to resolve a path inside the upload directory.
    #[sea_orm(unique)]
    pub stored_filename: String,

    /// Uploader-supplied display name. Untrusted; never a path.
    pub original_name: String,

    /// RFC 3339 UTC
    pub upload_date: String,

    pub status: String,

    pub file_size: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
