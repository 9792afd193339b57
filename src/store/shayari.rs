//! Shayari data model and repository.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use validator::{Validate, ValidationError};

use super::{read_records, write_records, IdGenerator};
use crate::error::{AppError, AppResult};

/// Author recorded when none is given.
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// A single diary entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shayari {
    /// Millisecond timestamp id.
    pub id: String,
    pub text: String,
    pub mood: String,
    pub author: String,
    /// Creation time; never changes after create.
    pub date: DateTime<Utc>,
    /// Public path of an attached image, e.g. `/uploads/1700000000000.jpg`.
    #[serde(default)]
    pub image_path: Option<String>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Fields accepted when creating an entry.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewShayari {
    #[validate(custom(function = "not_blank", message = "Shayari text is required"))]
    #[serde(default)]
    pub text: String,
    #[validate(custom(function = "not_blank", message = "Mood is required"))]
    #[serde(default)]
    pub mood: String,
    pub author: Option<String>,
    pub image_path: Option<String>,
}

/// Partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShayariPatch {
    #[validate(custom(function = "not_blank", message = "Shayari text cannot be blank"))]
    pub text: Option<String>,
    #[validate(custom(function = "not_blank", message = "Mood cannot be blank"))]
    pub mood: Option<String>,
    pub author: Option<String>,
    pub image_path: Option<String>,
}

impl ShayariPatch {
    fn apply(self, entry: &mut Shayari) {
        if let Some(text) = self.text {
            entry.text = text;
        }
        if let Some(mood) = self.mood {
            entry.mood = mood;
        }
        if let Some(author) = self.author {
            entry.author = if author.trim().is_empty() {
                DEFAULT_AUTHOR.to_string()
            } else {
                author
            };
        }
        if let Some(image_path) = self.image_path {
            entry.image_path = Some(image_path);
        }
    }
}

/// Case-insensitive substring filters; both must match when both are set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchCriteria {
    pub mood: Option<String>,
    pub text: Option<String>,
}

impl SearchCriteria {
    fn mood_needle(&self) -> Option<String> {
        self.mood
            .as_deref()
            .filter(|m| !m.is_empty())
            .map(str::to_lowercase)
    }

    fn text_needle(&self) -> Option<String> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// True when no filter was supplied.
    pub fn is_empty(&self) -> bool {
        self.mood_needle().is_none() && self.text_needle().is_none()
    }

    pub fn filter(&self, entries: Vec<Shayari>) -> Vec<Shayari> {
        let mood = self.mood_needle();
        let text = self.text_needle();
        entries
            .into_iter()
            .filter(|s| {
                mood.as_ref()
                    .map_or(true, |m| s.mood.to_lowercase().contains(m))
                    && text
                        .as_ref()
                        .map_or(true, |t| s.text.to_lowercase().contains(t))
            })
            .collect()
    }
}

/// Oldest and newest entry dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub oldest: DateTime<Utc>,
    pub newest: DateTime<Utc>,
}

/// Aggregate counts over the whole diary.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShayariStats {
    pub total_count: usize,
    pub mood_counts: BTreeMap<String, usize>,
    pub author_counts: BTreeMap<String, usize>,
    pub date_range: Option<DateRange>,
}

impl ShayariStats {
    pub fn from_entries(entries: &[Shayari]) -> Self {
        let mut mood_counts = BTreeMap::new();
        let mut author_counts = BTreeMap::new();
        for entry in entries {
            *mood_counts.entry(entry.mood.clone()).or_insert(0) += 1;
            *author_counts.entry(entry.author.clone()).or_insert(0) += 1;
        }

        let date_range = entries
            .iter()
            .map(|e| e.date)
            .min()
            .zip(entries.iter().map(|e| e.date).max())
            .map(|(oldest, newest)| DateRange { oldest, newest });

        Self {
            total_count: entries.len(),
            mood_counts,
            author_counts,
            date_range,
        }
    }
}

/// Trait for shayari repository operations.
pub trait ShayariRepository: Send + Sync {
    /// All entries in insertion order.
    fn list_all(&self) -> AppResult<Vec<Shayari>>;

    /// Find an entry by ID.
    fn find_by_id(&self, id: &str) -> AppResult<Option<Shayari>>;

    /// Create and persist a new entry.
    fn create(&self, new: NewShayari) -> AppResult<Shayari>;

    /// Apply a partial update to an existing entry.
    fn update(&self, id: &str, patch: ShayariPatch) -> AppResult<Shayari>;

    /// Delete an entry by ID. Returns whether anything was removed.
    fn delete(&self, id: &str) -> AppResult<bool>;

    /// Entries matching the search criteria.
    fn search(&self, criteria: &SearchCriteria) -> AppResult<Vec<Shayari>> {
        Ok(criteria.filter(self.list_all()?))
    }

    /// Aggregate statistics.
    fn stats(&self) -> AppResult<ShayariStats> {
        Ok(ShayariStats::from_entries(&self.list_all()?))
    }
}

/// JSON file-based shayari repository.
#[derive(Debug)]
pub struct JsonShayariRepository {
    file_path: PathBuf,
    ids: Arc<IdGenerator>,
    /// In-memory copy of the file, in file order.
    cache: RwLock<Vec<Shayari>>,
}

impl JsonShayariRepository {
    /// Open the repository, loading whatever the file currently holds.
    pub fn new(file_path: impl AsRef<Path>, ids: Arc<IdGenerator>) -> AppResult<Self> {
        let repo = Self {
            file_path: file_path.as_ref().to_path_buf(),
            ids,
            cache: RwLock::new(Vec::new()),
        };
        repo.load()?;
        Ok(repo)
    }

    /// Reload the cache from disk.
    pub fn load(&self) -> AppResult<()> {
        let entries: Vec<Shayari> = read_records(&self.file_path)?;
        for entry in &entries {
            self.ids.observe(&entry.id);
        }

        let mut cache = self.cache.write();
        *cache = entries;
        tracing::info!(count = cache.len(), path = %self.file_path.display(), "Loaded shayari entries");
        Ok(())
    }

    /// Persist `next`, then make it the cached state.
    fn commit(&self, cache: &mut Vec<Shayari>, next: Vec<Shayari>) -> AppResult<()> {
        write_records(&self.file_path, &next)?;
        *cache = next;
        Ok(())
    }
}

impl ShayariRepository for JsonShayariRepository {
    fn list_all(&self) -> AppResult<Vec<Shayari>> {
        Ok(self.cache.read().clone())
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Shayari>> {
        Ok(self.cache.read().iter().find(|s| s.id == id).cloned())
    }

    fn create(&self, new: NewShayari) -> AppResult<Shayari> {
        new.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let entry = Shayari {
            id: self.ids.next_id(),
            text: new.text,
            mood: new.mood,
            author: new
                .author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            date: Utc::now(),
            image_path: new.image_path.filter(|p| !p.trim().is_empty()),
        };

        let mut cache = self.cache.write();
        let mut next = cache.clone();
        next.push(entry.clone());
        self.commit(&mut cache, next)?;

        tracing::info!(id = %entry.id, mood = %entry.mood, "Created shayari");
        Ok(entry)
    }

    fn update(&self, id: &str, patch: ShayariPatch) -> AppResult<Shayari> {
        patch
            .validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        let mut cache = self.cache.write();
        let mut next = cache.clone();
        let entry = next
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| AppError::shayari_not_found(id))?;
        patch.apply(entry);
        let updated = entry.clone();
        self.commit(&mut cache, next)?;

        tracing::info!(id = %id, "Updated shayari");
        Ok(updated)
    }

    fn delete(&self, id: &str) -> AppResult<bool> {
        let mut cache = self.cache.write();
        if !cache.iter().any(|s| s.id == id) {
            return Ok(false);
        }

        let next: Vec<Shayari> = cache.iter().filter(|s| s.id != id).cloned().collect();
        self.commit(&mut cache, next)?;

        tracing::info!(id = %id, "Deleted shayari");
        Ok(true)
    }
}

/// Thread-safe handle to a shayari repository.
pub type SharedShayariRepository = Arc<dyn ShayariRepository>;

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn create_test_repo() -> (TempDir, JsonShayariRepository) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shayari.json");
        let repo = JsonShayariRepository::new(&path, Arc::new(IdGenerator::new())).unwrap();
        (dir, repo)
    }

    fn new_entry(text: &str, mood: &str) -> NewShayari {
        NewShayari {
            text: text.to_string(),
            mood: mood.to_string(),
            author: None,
            image_path: None,
        }
    }

    #[test]
    fn test_create_defaults_and_persists() {
        let (dir, repo) = create_test_repo();
        let created = repo.create(new_entry("Dil ki baat", "sad")).unwrap();

        assert_eq!(created.author, DEFAULT_AUTHOR);
        assert_eq!(created.image_path, None);

        let reopened =
            JsonShayariRepository::new(dir.path().join("shayari.json"), Arc::new(IdGenerator::new()))
                .unwrap();
        assert_eq!(reopened.find_by_id(&created.id).unwrap(), Some(created));
    }

    #[test]
    fn test_create_requires_text_and_mood() {
        let (_dir, repo) = create_test_repo();

        assert!(matches!(
            repo.create(new_entry("   ", "happy")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            repo.create(new_entry("words", "")),
            Err(AppError::Validation(_))
        ));
        assert!(repo.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_update_keeps_id_and_date() {
        let (_dir, repo) = create_test_repo();
        let created = repo.create(new_entry("first", "calm")).unwrap();

        let updated = repo
            .update(
                &created.id,
                ShayariPatch {
                    text: Some("second".into()),
                    image_path: Some("/uploads/1.png".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.date, created.date);
        assert_eq!(updated.text, "second");
        assert_eq!(updated.mood, "calm");
        assert_eq!(updated.image_path.as_deref(), Some("/uploads/1.png"));
    }

    #[test]
    fn test_update_blank_author_falls_back_to_default() {
        let (_dir, repo) = create_test_repo();
        let mut entry = new_entry("sher", "calm");
        entry.author = Some("Faiz".into());
        let created = repo.create(entry).unwrap();

        let updated = repo
            .update(
                &created.id,
                ShayariPatch {
                    author: Some("  ".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.author, DEFAULT_AUTHOR);
    }

    #[test]
    fn test_long_fields_are_accepted() {
        let (_dir, repo) = create_test_repo();
        let mut entry = new_entry(&"dil ".repeat(5000), &"udaas".repeat(20));
        entry.author = Some("a".repeat(300));

        let created = repo.create(entry).unwrap();
        assert_eq!(created.text.len(), 20000);
    }

    #[test]
    fn test_update_unknown_id() {
        let (_dir, repo) = create_test_repo();
        let result = repo.update("missing", ShayariPatch::default());
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_delete() {
        let (_dir, repo) = create_test_repo();
        let a = repo.create(new_entry("a", "x")).unwrap();
        let b = repo.create(new_entry("b", "y")).unwrap();

        assert!(repo.delete(&a.id).unwrap());
        assert!(!repo.delete(&a.id).unwrap());
        assert_eq!(repo.list_all().unwrap(), vec![b]);
    }

    #[test]
    fn test_search_is_case_insensitive_and_combined() {
        let (_dir, repo) = create_test_repo();
        repo.create(new_entry("Chand Raat", "Romantic")).unwrap();
        repo.create(new_entry("Barish ki raat", "sad")).unwrap();
        repo.create(new_entry("Subah", "romantic")).unwrap();

        let by_mood = SearchCriteria {
            mood: Some("ROMANTIC".into()),
            text: None,
        };
        assert_eq!(repo.search(&by_mood).unwrap().len(), 2);

        let both = SearchCriteria {
            mood: Some("rom".into()),
            text: Some("raat".into()),
        };
        let results = repo.search(&both).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "Chand Raat");

        assert!(SearchCriteria {
            mood: Some(String::new()),
            text: None
        }
        .is_empty());
    }

    #[test]
    fn test_stats() {
        let (_dir, repo) = create_test_repo();
        assert!(repo.stats().unwrap().date_range.is_none());

        let first = repo.create(new_entry("a", "sad")).unwrap();
        repo.create(NewShayari {
            author: Some("Ghalib".into()),
            ..new_entry("b", "sad")
        })
        .unwrap();
        let last = repo.create(new_entry("c", "happy")).unwrap();

        let stats = repo.stats().unwrap();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.mood_counts["sad"], 2);
        assert_eq!(stats.author_counts[DEFAULT_AUTHOR], 2);
        assert_eq!(stats.author_counts["Ghalib"], 1);
        let range = stats.date_range.unwrap();
        assert_eq!(range.oldest, first.date);
        assert_eq!(range.newest, last.date);
    }

    #[test]
    fn test_loads_records_written_by_older_versions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("shayari.json");
        std::fs::write(
            &path,
            r#"[{"id":"1700000000000","text":"t","mood":"m","author":"a",
                "date":"2023-11-14T22:13:20.000Z","imagePath":null},
               {"id":"broken"}]"#,
        )
        .unwrap();

        let ids = Arc::new(IdGenerator::new());
        let repo = JsonShayariRepository::new(&path, ids.clone()).unwrap();
        assert_eq!(repo.list_all().unwrap().len(), 1);
        assert!(ids.next_millis() > 1_700_000_000_000);
    }
}
