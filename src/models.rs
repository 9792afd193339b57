use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::playback::{AttemptOutcome, AttemptReport};
use crate::store::{IdGenerator, MusicLibrary, SharedShayariRepository, StoragePaths};

#[derive(Clone)]
pub struct AppState {
    pub paths: StoragePaths,
    pub shayari: SharedShayariRepository,
    pub library: Arc<MusicLibrary>,
    pub ids: Arc<IdGenerator>,
    pub max_upload_bytes: usize,
}

/// Success envelope shared by the JSON endpoints.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            count: None,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

/// Body-less success, e.g. after a delete.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub success: bool,
    pub image_path: String,
}

#[derive(Debug, Deserialize)]
pub struct FilenameQuery {
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub filename: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListTracksQuery {
    pub mood: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SourcesQuery {
    /// Comma-separated formats the client can decode.
    #[serde(default)]
    pub formats: String,
    /// Candidate index to start the pass at.
    #[serde(default)]
    pub start: usize,
    /// Whether the user has interacted with the page yet.
    #[serde(default = "default_true")]
    pub interacted: bool,
    /// Index of the source the client just tried.
    pub attempt: Option<usize>,
    /// How that attempt went.
    pub outcome: Option<AttemptOutcome>,
}

impl SourcesQuery {
    /// The reported attempt, if any. `attempt` and `outcome` come as a pair.
    pub fn report(&self) -> AppResult<Option<AttemptReport>> {
        match (self.attempt, self.outcome) {
            (Some(index), Some(outcome)) => Ok(Some(AttemptReport { index, outcome })),
            (None, None) => Ok(None),
            _ => Err(AppError::BadRequest(
                "attempt and outcome must be given together".to_string(),
            )),
        }
    }
}

fn default_true() -> bool {
    true
}
