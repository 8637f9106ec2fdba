//! Derives a safe, collision-free on-disk name from an untrusted filename.
//!
//! The stored name is the join key between the upload directory and the
//! document record. It is produced once at upload time; nothing downstream
//! ever re-derives a path from user input.

use std::path::Path;

use crate::config::UploadConfig;

use super::UploadError;

/// Cap on the `name_1.ext`, `name_2.ext`, ... collision probe sequence.
pub const MAX_COLLISION_ATTEMPTS: u32 = 10_000;

/// A sanitized base/extension pair, extension lowercased without its dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    pub base: String,
    pub ext: String,
}

impl SanitizedName {
    /// Candidate stored filenames in probe order: `base.ext`, then
    /// `base_1.ext`, `base_2.ext`, ... up to [`MAX_COLLISION_ATTEMPTS`].
    pub fn candidates(&self) -> impl Iterator<Item = String> + '_ {
        (0..=MAX_COLLISION_ATTEMPTS).map(move |n| {
            if n == 0 {
                format!("{}.{}", self.base, self.ext)
            } else {
                format!("{}_{}.{}", self.base, n, self.ext)
            }
        })
    }
}

/// Split a filename into base and extension at the last dot.
///
/// Extensions listed in `compound_extensions` (e.g. `tar.gz`) are kept
/// whole. Returns `None` when there is no dot, or nothing before/after it
/// that could serve as an extension split.
#[must_use]
pub fn split_extension<'a>(
    filename: &'a str,
    compound_extensions: &[String],
) -> Option<(&'a str, &'a str)> {
    let lower = filename.to_ascii_lowercase();
    for compound in compound_extensions {
        let suffix = format!(".{}", compound.to_ascii_lowercase());
        if lower.ends_with(&suffix) && lower.len() > suffix.len() {
            let split_at = filename.len() - suffix.len();
            return Some((&filename[..split_at], &filename[split_at + 1..]));
        }
    }

    let idx = filename.rfind('.')?;
    Some((&filename[..idx], &filename[idx + 1..]))
}

/// Strip everything outside `[A-Za-z0-9._-]`, then trim leading/trailing
/// dots and underscores so no hidden-file or bare-separator names survive.
fn sanitize_component(part: &str) -> String {
    let filtered: String = part
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();

    filtered.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Produce a sanitized name for an untrusted filename, validated against
/// the extension allow-list. Collision resolution happens separately, via
/// [`SanitizedName::candidates`].
pub fn sanitize(filename: &str, config: &UploadConfig) -> Result<SanitizedName, UploadError> {
    let (base_part, ext_part) =
        split_extension(filename, &config.compound_extensions).ok_or(UploadError::MissingExtension)?;

    let mut base = sanitize_component(base_part);
    if base.is_empty() {
        // Nothing safe survived; fall back to a random token so the name
        // stays non-empty and collision-resistant.
        base = uuid::Uuid::new_v4().simple().to_string();
    }

    let ext = sanitize_component(&ext_part.to_lowercase());
    if ext.is_empty() {
        return Err(UploadError::MissingExtension);
    }

    if !config
        .allowed_extensions
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&ext))
    {
        return Err(UploadError::DisallowedExtension(ext));
    }

    Ok(SanitizedName { base, ext })
}

/// Resolve a name that does not currently exist in `dir`.
///
/// This is a preview: the pipeline's `create_new` open is the authoritative
/// guard against concurrent uploads racing for the same name.
pub fn unique_name_in(dir: &Path, name: &SanitizedName) -> Result<String, UploadError> {
    for candidate in name.candidates() {
        if !dir.join(&candidate).exists() {
            return Ok(candidate);
        }
    }

    Err(UploadError::NameSpaceExhausted)
}
