//! Music library metadata.
//!
//! Uploaded tracks are indexed in `metadata.json` next to the audio files.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::{read_records, write_records, IdGenerator, METADATA_FILE};
use crate::error::AppResult;

/// Canonical prefix of every track path.
pub const TRACK_PATH_PREFIX: &str = "/api/music/";

/// Artist recorded for tracks imported from the public sample directory.
pub const SAMPLE_ARTIST: &str = "Sample Music";

/// One entry of the metadata file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub mood: String,
    #[serde(default)]
    pub filename: String,
    /// Public URL path, `/api/music/<filename>` once normalised.
    pub path: String,
    #[serde(default)]
    pub uploaded: Option<DateTime<Utc>>,
    /// Length in seconds, when the tags could be read.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
}

impl Track {
    /// Build a track for a file stored in the music directory.
    pub fn new(id: String, title: String, artist: String, mood: String, filename: String) -> Self {
        Self {
            id,
            title,
            artist,
            mood,
            path: format!("{}{}", TRACK_PATH_PREFIX, filename),
            filename,
            uploaded: Some(Utc::now()),
            duration: None,
        }
    }

    /// The stored filename, or the last segment of the path for older entries.
    pub fn file_name(&self) -> &str {
        if !self.filename.is_empty() {
            return &self.filename;
        }
        last_segment(&self.path)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Canonical form of a track path, or `None` when it is already canonical.
///
/// `/music/x` gains the `/api` prefix; anything else is rebuilt from the
/// filename (or the last path segment).
pub fn normalize_track_path(path: &str, filename: &str) -> Option<String> {
    if path.is_empty() || path.starts_with(TRACK_PATH_PREFIX) {
        return None;
    }

    if path.starts_with("/music/") {
        return Some(format!("/api{}", path));
    }

    let name = if filename.is_empty() {
        last_segment(path)
    } else {
        filename
    };
    Some(format!("{}{}", TRACK_PATH_PREFIX, name))
}

/// Title for a sample file: extension and leading `digits-` dropped,
/// `_` and `-` turned into spaces.
pub fn title_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());

    let digits = stem.chars().take_while(|c| c.is_ascii_digit()).count();
    let stem = if digits > 0 && stem[digits..].starts_with('-') {
        &stem[digits + 1..]
    } else {
        stem.as_str()
    };

    stem.replace(&['_', '-'][..], " ")
}

/// JSON-backed index of the music directory.
#[derive(Debug)]
pub struct MusicLibrary {
    music_dir: PathBuf,
    metadata_path: PathBuf,
    tracks: RwLock<Vec<Track>>,
}

impl MusicLibrary {
    /// Open the library, normalising any legacy track paths on disk.
    pub fn open(music_dir: impl AsRef<Path>, ids: &IdGenerator) -> AppResult<Self> {
        let music_dir = music_dir.as_ref().to_path_buf();
        let metadata_path = music_dir.join(METADATA_FILE);

        let mut tracks: Vec<Track> = read_records(&metadata_path)?;
        for track in &tracks {
            ids.observe(&track.id);
        }

        let mut fixed = 0;
        for track in tracks.iter_mut() {
            if let Some(path) = normalize_track_path(&track.path, &track.filename) {
                track.path = path;
                fixed += 1;
            }
            if track.filename.is_empty() {
                track.filename = last_segment(&track.path).to_string();
            }
        }
        if fixed > 0 {
            write_records(&metadata_path, &tracks)?;
            tracing::info!(fixed, "Normalised music paths in metadata file");
        }

        tracing::info!(count = tracks.len(), path = %metadata_path.display(), "Loaded music library");

        Ok(Self {
            music_dir,
            metadata_path,
            tracks: RwLock::new(tracks),
        })
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// All tracks, optionally restricted to a mood (case-insensitive substring).
    pub fn list(&self, mood: Option<&str>) -> Vec<Track> {
        let tracks = self.tracks.read();
        match mood.map(str::to_lowercase).filter(|m| !m.is_empty()) {
            Some(mood) => tracks
                .iter()
                .filter(|t| t.mood.to_lowercase().contains(&mood))
                .cloned()
                .collect(),
            None => tracks.clone(),
        }
    }

    pub fn find_by_id(&self, id: &str) -> Option<Track> {
        self.tracks.read().iter().find(|t| t.id == id).cloned()
    }

    /// Append a track and persist the metadata file.
    pub fn add(&self, track: Track) -> AppResult<Track> {
        let mut tracks = self.tracks.write();
        let mut next = tracks.clone();
        next.push(track.clone());
        write_records(&self.metadata_path, &next)?;
        *tracks = next;

        tracing::info!(id = %track.id, filename = %track.filename, "Added track to library");
        Ok(track)
    }

    /// Copy unknown `.mp3` files from `sample_dir` into the library.
    ///
    /// Returns the number of tracks registered.
    pub fn import_samples(&self, sample_dir: &Path, ids: &IdGenerator) -> AppResult<usize> {
        if !sample_dir.is_dir() {
            return Ok(0);
        }

        let mut tracks = self.tracks.write();
        let mut next = tracks.clone();
        let mut imported = 0;

        let mut files: Vec<PathBuf> = fs::read_dir(sample_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        for source in files {
            let Some(filename) = source.file_name().map(|f| f.to_string_lossy().into_owned())
            else {
                continue;
            };
            if !filename.ends_with(".mp3") || next.iter().any(|t| t.file_name() == filename) {
                continue;
            }

            let dest = self.music_dir.join(&filename);
            if dest.exists() {
                continue;
            }
            fs::copy(&source, &dest)?;

            next.push(Track::new(
                ids.next_id(),
                title_from_filename(&filename),
                SAMPLE_ARTIST.to_string(),
                String::new(),
                filename,
            ));
            imported += 1;
        }

        if imported > 0 {
            write_records(&self.metadata_path, &next)?;
            *tracks = next;
            tracing::info!(imported, dir = %sample_dir.display(), "Imported sample music");
        }

        Ok(imported)
    }
}
