//! Media file naming, typing and lookup shared by the image and music routes.

pub mod form;
pub mod tags;

pub use form::read_form;
pub use tags::probe_tags;

use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

lazy_static::lazy_static! {
    static ref SLUG_REGEX: regex::Regex = regex::Regex::new(r"[^a-zA-Z0-9]").unwrap();
    static ref EXTENSION_REGEX: regex::Regex = regex::Regex::new(r"^[a-z0-9]{1,8}$").unwrap();
}

/// Image extensions accepted for upload.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Supported audio file extensions.
pub const AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "flac", "ogg", "wav", "m4a", "aac", "wma", "opus", "aiff", "ape",
];

/// Validate a filename taken from a request to prevent path traversal.
pub fn sanitize_filename(filename: &str) -> AppResult<&str> {
    if filename.is_empty() {
        return Err(AppError::BadRequest("Filename cannot be empty".to_string()));
    }

    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        tracing::warn!(filename = %filename, "Path traversal attempt blocked");
        return Err(AppError::path_traversal());
    }

    // Windows drive letters
    if filename.chars().nth(1) == Some(':') {
        return Err(AppError::path_traversal());
    }

    Ok(filename)
}

/// Lower-cased extension of a client-supplied filename, or `default`.
///
/// Anything that does not look like a plain extension falls back to `default`.
pub fn extension_or(filename: Option<&str>, default: &str) -> String {
    filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| EXTENSION_REGEX.is_match(ext))
        .unwrap_or_else(|| default.to_string())
}

/// Replace every non-alphanumeric character with `_` and lower-case.
pub fn slugify(title: &str) -> String {
    SLUG_REGEX.replace_all(title, "_").to_lowercase()
}

pub fn is_image_extension(ext: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&ext)
}

pub fn is_audio_extension(ext: &str) -> bool {
    AUDIO_EXTENSIONS.contains(&ext)
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Content type for an uploaded image.
pub fn image_content_type(path: &Path) -> &'static str {
    match extension_of(path).as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Content type for an audio file; unknown extensions are served as MP3.
pub fn audio_content_type(path: &Path) -> &'static str {
    match extension_of(path).as_str() {
        "wav" => "audio/wav",
        "ogg" | "opus" => "audio/ogg",
        "m4a" | "aac" => "audio/mp4",
        "flac" => "audio/flac",
        _ => "audio/mpeg",
    }
}

/// Find `filename` in `primary`, then in `fallback`.
pub fn resolve(primary: &Path, fallback: &Path, filename: &str) -> AppResult<PathBuf> {
    let filename = sanitize_filename(filename)?;
    let candidates = [primary.join(filename), fallback.join(filename)];

    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return Ok(found.clone());
    }

    Err(AppError::FileNotFound {
        name: filename.to_string(),
        searched: candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
    })
}

/// Sibling of `path` with the same stem and extension `format`, if it exists.
pub fn format_variant(path: &Path, format: &str) -> Option<PathBuf> {
    let format = format.to_lowercase();
    if !is_audio_extension(&format) || extension_of(path) == format {
        return None;
    }
    let variant = path.with_extension(&format);
    variant.is_file().then_some(variant)
}
