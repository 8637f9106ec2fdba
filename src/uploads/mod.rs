//! The upload core: filename sanitization, pre-write validation, and the
//! validate -> sanitize -> persist -> record pipeline.

use thiserror::Error;

pub mod pipeline;
pub mod sanitize;
pub mod validate;

pub use pipeline::{StoredDocument, UploadService};

/// Errors that can occur during file upload operations.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No file provided or empty filename.
    #[error("No file selected. Please choose a document to upload")]
    NoFile,

    /// Filename has no usable extension.
    #[error("Filename is missing a file extension")]
    MissingExtension,

    /// Extension is not on the configured allow-list.
    #[error("File type '{0}' is not allowed")]
    DisallowedExtension(String),

    /// Sniffed content type is not on the configured allow-list.
    #[error("File content type '{0}' is not allowed")]
    DisallowedMimeType(String),

    /// Payload exceeds the configured maximum.
    #[error("File too large (max: {max_bytes} bytes)")]
    TooLarge { max_bytes: usize },

    /// Collision resolution gave up after the attempt cap.
    #[error("Could not find a free filename in the upload directory")]
    NameSpaceExhausted,

    /// Disk write/read failure.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Metadata record could not be written; the disk file was removed.
    #[error("Metadata error: {0}")]
    MetadataWrite(String),
}

impl UploadError {
    /// True for user-correctable rejections, as opposed to server faults.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::NoFile
                | Self::MissingExtension
                | Self::DisallowedExtension(_)
                | Self::DisallowedMimeType(_)
                | Self::TooLarge { .. }
        )
    }
}
