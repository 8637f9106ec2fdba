//! Admit/reject decisions for a candidate upload, made before any disk
//! write happens.

use crate::config::UploadConfig;

use super::UploadError;
use super::sanitize::split_extension;

/// How much of the payload the magic-byte sniffer inspects.
pub const SNIFF_PREFIX_LEN: usize = 1024;

/// Extension allow-list check without sanitization, case-insensitive.
#[must_use]
pub fn extension_allowed(filename: &str, config: &UploadConfig) -> bool {
    split_extension(filename, &config.compound_extensions).is_some_and(|(_, ext)| {
        config
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(ext))
    })
}

/// Detect a MIME type from a bounded payload prefix. The client-supplied
/// content-type header is never consulted.
#[must_use]
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    let prefix = &data[..data.len().min(SNIFF_PREFIX_LEN)];
    infer::get(prefix).map(|kind| kind.mime_type())
}

/// Run all pre-write checks against a candidate upload.
///
/// Rejections are pure functions of the input, so repeating a call on the
/// same disallowed input yields the same error kind.
pub fn validate(filename: &str, data: &[u8], config: &UploadConfig) -> Result<(), UploadError> {
    let (_, ext) = split_extension(filename, &config.compound_extensions)
        .ok_or(UploadError::MissingExtension)?;

    if !extension_allowed(filename, config) {
        return Err(UploadError::DisallowedExtension(ext.to_ascii_lowercase()));
    }

    let max_bytes = config.max_upload_bytes();
    if data.len() > max_bytes {
        return Err(UploadError::TooLarge { max_bytes });
    }

    if config.enforce_mime_sniffing {
        match sniff_mime(data) {
            Some(detected) if config.allowed_mime_types.iter().any(|m| m == detected) => {}
            Some(detected) => {
                return Err(UploadError::DisallowedMimeType(detected.to_string()));
            }
            None => {
                return Err(UploadError::DisallowedMimeType(
                    "unrecognized content".to_string(),
                ));
            }
        }
    }

    Ok(())
}
