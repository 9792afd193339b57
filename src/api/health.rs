//! Health check endpoints.

use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::models::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Service name.
    pub service: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    /// Service status.
    pub status: &'static str,
    /// Shayari data file present.
    pub shayari_file: bool,
    /// Uploads directory accessible.
    pub uploads_dir: bool,
    /// Music directory accessible.
    pub music_dir: bool,
}

/// Health check endpoint.
///
/// GET /health
///
/// Returns 200 if the service is running.
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: env!("CARGO_PKG_NAME"),
    })
}

/// Readiness check endpoint.
///
/// GET /ready
///
/// Returns 200 if the storage directories and data file are in place.
#[get("/ready")]
pub async fn ready(data: web::Data<AppState>) -> HttpResponse {
    let paths = &data.paths;

    let shayari_file_ok = paths.shayari_file.is_file();
    let uploads_dir_ok = paths.uploads_dir.is_dir();
    let music_dir_ok = paths.music_dir.is_dir();

    let all_ok = shayari_file_ok && uploads_dir_ok && music_dir_ok;

    let response = ReadyResponse {
        status: if all_ok { "ready" } else { "not_ready" },
        shayari_file: shayari_file_ok,
        uploads_dir: uploads_dir_ok,
        music_dir: music_dir_ok,
    };

    if all_ok {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// Configure health routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::state_in;
    use actix_web::{http::StatusCode, test, App};

    #[actix_rt::test]
    async fn test_ready_tracks_storage() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        let music_dir = state.paths.music_dir.clone();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/ready").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        std::fs::remove_dir_all(&music_dir).unwrap();
        let req = test::TestRequest::get().uri("/ready").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
