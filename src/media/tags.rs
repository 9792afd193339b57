//! Embedded audio tag probing.

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use std::path::Path;

/// What could be read from an audio file's tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Length in whole seconds.
    pub duration: Option<u32>,
}

/// Read title, artist and duration from `path`.
///
/// Unreadable or untagged files yield empty tags rather than an error.
pub fn probe_tags(path: &Path) -> AudioTags {
    let tagged_file = match read_from_path(path) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "No readable audio tags");
            return AudioTags::default();
        }
    };

    let tag = tagged_file.first_tag();
    let duration = tagged_file.properties().duration().as_secs() as u32;

    AudioTags {
        title: tag
            .and_then(|t| t.title())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        artist: tag
            .and_then(|t| t.artist())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        duration: (duration > 0).then_some(duration),
    }
}
