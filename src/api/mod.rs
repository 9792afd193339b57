//! HTTP API.

pub mod health;
pub mod music;
pub mod shayari;
pub mod uploads;

use actix_web::{error::JsonPayloadError, web};

use crate::error::AppError;

/// Largest JSON body accepted by the API.
const JSON_LIMIT: usize = 256 * 1024;

/// JSON extractor settings; rejected bodies get the standard error envelope.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| {
            let error = match err {
                JsonPayloadError::Overflow { limit }
                | JsonPayloadError::OverflowKnownLength { limit, .. } => {
                    AppError::PayloadTooLarge { limit }
                }
                other => AppError::BadRequest(other.to_string()),
            };
            error.into()
        })
}

/// Query extractor settings; malformed query strings get the error envelope.
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Register every route, with the extractor settings they rely on.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .configure(health::configure)
        .configure(shayari::configure)
        .configure(uploads::configure)
        .configure(music::configure);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::path::Path;
    use std::sync::Arc;

    use crate::models::AppState;
    use crate::store::{self, IdGenerator, JsonShayariRepository, MusicLibrary, StoragePaths};

    /// Fresh application state rooted at `root`.
    pub fn state_in(root: &Path) -> AppState {
        let paths = StoragePaths::under(root);
        store::bootstrap(&paths).unwrap();

        let ids = Arc::new(IdGenerator::new());
        let shayari = JsonShayariRepository::new(&paths.shayari_file, ids.clone()).unwrap();
        let library = MusicLibrary::open(&paths.music_dir, &ids).unwrap();

        AppState {
            paths,
            shayari: Arc::new(shayari),
            library: Arc::new(library),
            ids,
            max_upload_bytes: 1024 * 1024,
        }
    }

    /// A `multipart/form-data` body with the given `(name, filename, content)` parts.
    pub fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> (String, Vec<u8>) {
        let boundary = "----jazbaat-test-boundary";
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                ),
            }
            body.extend_from_slice(data.as_bytes());
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

        (format!("multipart/form-data; boundary={}", boundary), body)
    }
}
