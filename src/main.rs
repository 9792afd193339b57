//! Jazbaat - a self-hosted shayari diary.
//!
//! Serves a REST API over flat JSON files for diary entries, image uploads
//! and a small music library streamed to the browser.

mod api;
mod config;
mod error;
mod media;
mod models;
mod playback;
mod store;

use actix_cors::Cors;
use actix_web::{http::header, middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;
use crate::models::AppState;
use crate::store::{IdGenerator, JsonShayariRepository, MusicLibrary};

/// Initialize the tracing/logging subsystem.
fn init_tracing(config: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            subscriber
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Configure CORS based on application config.
fn configure_cors(config: &config::Config) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE, header::RANGE])
        .max_age(3600);

    if config.cors_origins.len() == 1 && config.cors_origins[0] == "*" {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

/// Graceful shutdown handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

fn startup_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    tracing::error!(error = %e, "{}", context);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

/// Prepare storage and open the repositories.
fn build_state(config: &config::Config) -> std::io::Result<AppState> {
    let paths = config.storage_paths();

    let report = store::bootstrap(&paths)
        .map_err(|e| startup_error("Failed to prepare data directories", e))?;
    tracing::info!(
        shayari_file = ?report.shayari_file,
        metadata_file = ?report.metadata_file,
        writable = report.writable,
        "Storage ready"
    );

    let ids = Arc::new(IdGenerator::new());

    let shayari = JsonShayariRepository::new(&paths.shayari_file, ids.clone())
        .map_err(|e| startup_error("Failed to open shayari data file", e))?;

    let library = MusicLibrary::open(&paths.music_dir, &ids)
        .map_err(|e| startup_error("Failed to open music library", e))?;

    if let Err(e) = library.import_samples(&paths.public_music_dir(), &ids) {
        tracing::warn!(error = %e, "Could not import sample music");
    }

    Ok(AppState {
        paths,
        shayari: Arc::new(shayari),
        library: Arc::new(library),
        ids,
        max_upload_bytes: config.max_upload_bytes,
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize configuration
    let config = config::init();

    // Initialize logging
    init_tracing(config);

    // Validate configuration
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }

    let app_state = build_state(config)?;
    let bind_address = config.bind_address();

    tracing::info!(
        address = %bind_address,
        data_dir = %config.data_dir.display(),
        music_dir = %config.music_dir.display(),
        "Starting Jazbaat server"
    );

    let server = HttpServer::new(move || {
        App::new()
            // Middleware (order matters - outermost first)
            .wrap(Logger::default())
            .wrap(TracingLogger::default())
            .wrap(configure_cors(config))
            .app_data(web::Data::new(app_state.clone()))
            .configure(api::configure)
    })
    .bind(&bind_address)?
    .shutdown_timeout(30)
    .run();

    // Run server with graceful shutdown
    tokio::select! {
        result = server => {
            result
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
    }
}
