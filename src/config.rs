//! Application configuration management.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::store::StoragePaths;

/// Global configuration instance.
static CONFIG: OnceLock<Config> = OnceLock::new();

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Root of the writable data tree.
    pub data_dir: PathBuf,
    /// Path to the shayari JSON file.
    pub shayari_file: PathBuf,
    /// Directory for uploaded images.
    pub uploads_dir: PathBuf,
    /// Directory for uploaded music and its metadata file.
    pub music_dir: PathBuf,
    /// Read-only fallback directory holding `uploads/` and `music/`.
    pub public_dir: PathBuf,
    /// Upper bound for a single multipart upload, in bytes.
    pub max_upload_bytes: usize,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Log format (json or pretty).
    pub log_format: LogFormat,
    /// Allowed CORS origins (comma-separated, or * for all).
    pub cors_origins: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable colored output.
    Pretty,
    /// JSON structured logging for production.
    Json,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if required configuration is missing or invalid.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16");

        let data_dir =
            PathBuf::from(std::env::var("DATA_DIR").unwrap_or_else(|_| "./.data".to_string()));

        let shayari_file = std::env::var("SHAYARI_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("shayari.json"));

        let uploads_dir = std::env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("uploads"));

        let music_dir = std::env::var("MUSIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("music"));

        let public_dir =
            PathBuf::from(std::env::var("PUBLIC_DIR").unwrap_or_else(|_| "./public".to_string()));

        let max_upload_mb = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "50".to_string())
            .parse::<usize>()
            .expect("MAX_UPLOAD_MB must be a valid integer");

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let cors_origins = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port,
            data_dir,
            shayari_file,
            uploads_dir,
            music_dir,
            public_dir,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            log_level,
            log_format,
            cors_origins,
        }
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// Returns an error if validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidUploadLimit);
        }

        if self.data_dir.exists() && !self.data_dir.is_dir() {
            return Err(ConfigError::DataDirNotDirectory(
                self.data_dir.display().to_string(),
            ));
        }

        if self.public_dir.exists() && !self.public_dir.is_dir() {
            tracing::warn!(
                public_dir = %self.public_dir.display(),
                "PUBLIC_DIR is not a directory, fallback lookups will find nothing"
            );
        }

        Ok(())
    }

    /// Storage locations derived from this configuration.
    pub fn storage_paths(&self) -> StoragePaths {
        StoragePaths {
            data_dir: self.data_dir.clone(),
            shayari_file: self.shayari_file.clone(),
            uploads_dir: self.uploads_dir.clone(),
            music_dir: self.music_dir.clone(),
            public_dir: self.public_dir.clone(),
        }
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Data directory is not a directory: {0}")]
    DataDirNotDirectory(String),

    #[error("MAX_UPLOAD_MB must be greater than zero")]
    InvalidUploadLimit,
}

/// Initialize the global configuration.
///
/// Should be called once at application startup.
pub fn init() -> &'static Config {
    CONFIG.get_or_init(|| {
        dotenvy::dotenv().ok();
        Config::from_env()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases touch process-wide env vars, so they run as one test.
    #[test]
    fn test_from_env() {
        for key in [
            "HOST",
            "PORT",
            "LOG_LEVEL",
            "DATA_DIR",
            "SHAYARI_FILE",
            "UPLOADS_DIR",
            "MUSIC_DIR",
            "MAX_UPLOAD_MB",
        ] {
            std::env::remove_var(key);
        }

        let config = Config::from_env();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.shayari_file, PathBuf::from("./.data/shayari.json"));
        assert_eq!(config.music_dir, PathBuf::from("./.data/music"));
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);

        std::env::set_var("DATA_DIR", "/srv/diary");
        std::env::set_var("CORS_ORIGINS", "http://localhost:3000, http://example.com");

        let config = Config::from_env();
        assert_eq!(config.uploads_dir, PathBuf::from("/srv/diary/uploads"));
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.cors_origins.contains(&"http://localhost:3000".to_string()));
        assert!(config.cors_origins.contains(&"http://example.com".to_string()));

        std::env::remove_var("DATA_DIR");
        std::env::remove_var("CORS_ORIGINS");
    }

    #[test]
    fn test_validate_rejects_file_as_data_dir() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::from_env();
        config.data_dir = file.path().to_path_buf();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DataDirNotDirectory(_))
        ));
    }
}
