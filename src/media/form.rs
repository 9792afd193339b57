//! Buffered multipart form reading.

use actix_multipart::Multipart;
use futures::StreamExt;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

/// An uploaded file held in memory.
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Filename as sent by the client.
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

/// All parts of a multipart request, keyed by field name.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, FilePart>,
}

impl UploadForm {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// A text field, trimmed; blank values count as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn take_file(&mut self, name: &str) -> Option<FilePart> {
        self.files.remove(name)
    }

    fn insert(&mut self, name: String, filename: Option<String>, data: Vec<u8>) {
        match filename {
            Some(filename) => {
                self.files.insert(
                    name,
                    FilePart {
                        filename: Some(filename),
                        data,
                    },
                );
            }
            None => {
                self.fields
                    .insert(name, String::from_utf8_lossy(&data).into_owned());
            }
        }
    }
}

/// Read the whole multipart payload, rejecting it once it exceeds `limit` bytes.
pub async fn read_form(mut payload: Multipart, limit: usize) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    let mut total = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;

        let (name, filename) = match field.content_disposition() {
            Some(cd) => (
                cd.get_name().unwrap_or_default().to_string(),
                cd.get_filename().map(str::to_string),
            ),
            None => (String::new(), None),
        };

        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk =
                chunk.map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;
            total += chunk.len();
            if total > limit {
                return Err(AppError::PayloadTooLarge { limit });
            }
            data.extend_from_slice(&chunk);
        }

        if name.is_empty() {
            tracing::debug!("Ignoring unnamed form part");
            continue;
        }
        form.insert(name, filename, data);
    }

    Ok(form)
}
