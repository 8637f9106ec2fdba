//! Orchestrates a single upload: validate, sanitize, write to disk under a
//! unique name, then record metadata. The disk write strictly precedes the
//! metadata insert, and a failed insert removes the file again so no
//! orphaned file can outlive a missing record.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{NewDocument, Store};

use super::UploadError;
use super::{sanitize, validate};

/// Initial review status for every new submission.
pub const DEFAULT_STATUS: &str = "Pending Review";

/// Outcome of a successful upload, echoed back to the caller.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub id: i32,
    pub stored_filename: String,
    pub original_name: String,
    pub file_size: i64,
    pub status: String,
}

pub struct UploadService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

/// Removes the written file unless disarmed. Covers both the metadata
/// failure path and cancellation between the disk write and the insert.
struct CleanupGuard {
    path: Option<PathBuf>,
}

impl CleanupGuard {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(&mut self) {
        self.path = None;
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                error!("Failed to clean up uploaded file {}: {e}", path.display());
            } else {
                info!("Cleaned up uploaded file {}", path.display());
            }
        }
    }
}

impl UploadService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }

    /// Run the full upload pipeline for one submission.
    pub async fn save_upload(
        &self,
        user_id: i32,
        original_filename: &str,
        data: &[u8],
    ) -> Result<StoredDocument, UploadError> {
        let original_filename = original_filename.trim();
        if original_filename.is_empty() {
            return Err(UploadError::NoFile);
        }

        let upload_cfg = self.config.read().await.uploads.clone();

        validate::validate(original_filename, data, &upload_cfg)?;

        let name = sanitize::sanitize(original_filename, &upload_cfg)?;

        let upload_dir = Path::new(&upload_cfg.upload_dir);
        tokio::fs::create_dir_all(upload_dir).await?;

        // create_new fuses the existence probe with the open, so two
        // concurrent uploads racing for the same base name cannot both win.
        let (stored_filename, path, mut file) = open_unique(upload_dir, &name).await?;
        let mut guard = CleanupGuard::new(path.clone());

        file.write_all(data).await?;
        file.flush().await?;
        drop(file);

        // Size comes from disk, not from anything the client claimed.
        let file_size = i64::try_from(tokio::fs::metadata(&path).await?.len()).unwrap_or(i64::MAX);

        let record = self
            .store
            .insert_document(NewDocument {
                user_id,
                stored_filename: stored_filename.clone(),
                original_name: original_filename.to_string(),
                status: DEFAULT_STATUS.to_string(),
                file_size,
            })
            .await
            .map_err(|e| {
                warn!(
                    stored_filename = %stored_filename,
                    "Document metadata insert failed, removing disk file: {e}"
                );
                UploadError::MetadataWrite(e.to_string())
            })?;

        guard.disarm();

        info!(
            document_id = record.id,
            stored_filename = %stored_filename,
            original_name = %original_filename,
            size = file_size,
            "Document uploaded"
        );

        Ok(StoredDocument {
            id: record.id,
            stored_filename,
            original_name: record.original_name,
            file_size,
            status: record.status,
        })
    }
}

/// Open the first candidate name that does not exist yet, atomically.
async fn open_unique(
    dir: &Path,
    name: &sanitize::SanitizedName,
) -> Result<(String, PathBuf, tokio::fs::File), UploadError> {
    for candidate in name.candidates() {
        let path = dir.join(&candidate);

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create_new(true);

        match options.open(&path).await {
            Ok(file) => return Ok((candidate, path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(UploadError::Storage(e)),
        }
    }

    Err(UploadError::NameSpaceExhausted)
}
