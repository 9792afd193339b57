//! Flat-file JSON storage.
//!
//! Every store is a single JSON array on disk. Files are validated (and reset
//! when unusable) at startup, read leniently, and rewritten atomically.

pub mod ids;
pub mod library;
pub mod shayari;

pub use ids::IdGenerator;
pub use library::{MusicLibrary, Track};
pub use shayari::{JsonShayariRepository, SharedShayariRepository};

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppResult;

/// Name of the music metadata file inside the music directory.
pub const METADATA_FILE: &str = "metadata.json";

/// On-disk locations used by the service.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    pub data_dir: PathBuf,
    pub shayari_file: PathBuf,
    pub uploads_dir: PathBuf,
    pub music_dir: PathBuf,
    pub public_dir: PathBuf,
}

impl StoragePaths {
    /// Lay out every store under a single root, with `public/` beside it.
    #[cfg(test)]
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let data_dir = root.join(".data");
        Self {
            shayari_file: data_dir.join("shayari.json"),
            uploads_dir: data_dir.join("uploads"),
            music_dir: data_dir.join("music"),
            public_dir: root.join("public"),
            data_dir,
        }
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.music_dir.join(METADATA_FILE)
    }

    pub fn public_uploads_dir(&self) -> PathBuf {
        self.public_dir.join("uploads")
    }

    pub fn public_music_dir(&self) -> PathBuf {
        self.public_dir.join("music")
    }
}

/// What [`ensure_json_array`] found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    /// File was missing and has been created as `[]`.
    Created,
    /// File already held a JSON array.
    Valid,
    /// File was unusable and has been reset to `[]`.
    Reset(String),
}

/// Make sure `path` exists and holds a JSON array, resetting it otherwise.
pub fn ensure_json_array(path: &Path) -> AppResult<FileState> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        fs::write(path, "[]")?;
        tracing::info!(path = %path.display(), "Created data file");
        return Ok(FileState::Created);
    }

    let content = fs::read_to_string(path)?;
    let reason = if content.trim().is_empty() {
        Some("file is empty".to_string())
    } else {
        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(value) if value.is_array() => None,
            Ok(_) => Some("file does not contain an array".to_string()),
            Err(e) => Some(format!("invalid JSON: {}", e)),
        }
    };

    match reason {
        None => {
            tracing::debug!(path = %path.display(), "Data file contains a valid array");
            Ok(FileState::Valid)
        }
        Some(reason) => {
            tracing::warn!(path = %path.display(), reason = %reason, "Resetting data file");
            fs::write(path, "[]")?;
            Ok(FileState::Reset(reason))
        }
    }
}

/// Read every well-formed record from a JSON array file.
///
/// A missing, empty or non-array file yields no records. Elements that fail
/// to deserialize are skipped with a warning.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }

    let items = match serde_json::from_str::<serde_json::Value>(&content)? {
        serde_json::Value::Array(items) => items,
        _ => {
            tracing::warn!(path = %path.display(), "Data file is not an array, ignoring contents");
            return Ok(Vec::new());
        }
    };

    let total = items.len();
    let records: Vec<T> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(path = %path.display(), index, error = %e, "Skipping malformed record");
                None
            }
        })
        .collect();

    tracing::debug!(path = %path.display(), loaded = records.len(), total, "Read records");
    Ok(records)
}

/// Replace the contents of `path` with `records`, via a temp file and rename.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> AppResult<()> {
    let content = serde_json::to_string_pretty(records)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &content)?;
    fs::rename(&temp_path, path)?;

    tracing::debug!(path = %path.display(), count = records.len(), "Saved records");
    Ok(())
}

/// Result of the startup storage bootstrap.
#[derive(Debug)]
pub struct BootstrapReport {
    pub shayari_file: FileState,
    pub metadata_file: FileState,
    pub writable: bool,
}

/// Create every directory and data file the service needs.
///
/// Safe to run repeatedly. Only directory or file creation failures are
/// fatal; an unwritable data directory is reported but tolerated.
pub fn bootstrap(paths: &StoragePaths) -> AppResult<BootstrapReport> {
    for dir in [&paths.data_dir, &paths.uploads_dir, &paths.music_dir] {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            tracing::info!(dir = %dir.display(), "Created directory");
        }
    }

    let shayari_file = ensure_json_array(&paths.shayari_file)?;
    let metadata_file = ensure_json_array(&paths.metadata_file())?;
    let writable = probe_writable(&paths.data_dir);

    Ok(BootstrapReport {
        shayari_file,
        metadata_file,
        writable,
    })
}

fn probe_writable(dir: &Path) -> bool {
    let probe = dir.join(".permission-test");
    match fs::write(&probe, "test").and_then(|_| fs::remove_file(&probe)) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(dir = %dir.display(), error = %e, "Data directory is not writable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Row {
        id: String,
    }

    #[test]
    fn test_ensure_creates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/data.json");

        assert_eq!(ensure_json_array(&path).unwrap(), FileState::Created);
        assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        assert_eq!(ensure_json_array(&path).unwrap(), FileState::Valid);
    }

    #[test]
    fn test_ensure_resets_unusable_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");

        for content in ["", "   \n", "{not json", "{\"a\": 1}"] {
            fs::write(&path, content).unwrap();
            assert!(matches!(
                ensure_json_array(&path).unwrap(),
                FileState::Reset(_)
            ));
            assert_eq!(fs::read_to_string(&path).unwrap(), "[]");
        }
    }

    #[test]
    fn test_read_records_skips_malformed_entries() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        fs::write(&path, r#"[{"id": "1"}, {"nope": true}, {"id": "3"}]"#).unwrap();

        let rows: Vec<Row> = read_records(&path).unwrap();
        assert_eq!(rows, vec![Row { id: "1".into() }, Row { id: "3".into() }]);
    }

    #[test]
    fn test_read_records_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let rows: Vec<Row> = read_records(&dir.path().join("absent.json")).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_write_records_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.json");
        write_records(&path, &[Row { id: "a".into() }]).unwrap();
        write_records(&path, &[Row { id: "b".into() }]).unwrap();

        let rows: Vec<Row> = read_records(&path).unwrap();
        assert_eq!(rows, vec![Row { id: "b".into() }]);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_bootstrap_is_idempotent() {
        let dir = tempdir().unwrap();
        let paths = StoragePaths::under(dir.path());

        let first = bootstrap(&paths).unwrap();
        assert_eq!(first.shayari_file, FileState::Created);
        assert_eq!(first.metadata_file, FileState::Created);
        assert!(first.writable);
        assert!(paths.uploads_dir.is_dir());

        let second = bootstrap(&paths).unwrap();
        assert_eq!(second.shayari_file, FileState::Valid);
        assert_eq!(second.metadata_file, FileState::Valid);
        assert!(!paths.data_dir.join(".permission-test").exists());
    }
}
