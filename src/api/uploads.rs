//! Image upload and serving endpoints.

use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::{
    get,
    http::header::{self, HeaderValue},
    post, web, HttpRequest, HttpResponse,
};
use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::media;
use crate::models::{AppState, FilenameQuery, ImageUploadResponse};

/// Public URL prefix for uploaded images.
const UPLOADS_PREFIX: &str = "/uploads/";

/// Upload an image for a shayari entry.
///
/// POST /api/upload
///
/// Expects a multipart form with an `image` file field. Returns the public
/// path to store as the entry's `imagePath`.
#[post("/api/upload")]
pub async fn upload_image(
    data: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = media::read_form(payload, data.max_upload_bytes).await?;
    if form.is_empty() {
        return Err(AppError::BadRequest("No file uploaded".to_string()));
    }

    let file = form
        .take_file("image")
        .ok_or_else(|| AppError::BadRequest("No image found in request".to_string()))?;
    if file.data.is_empty() {
        return Err(AppError::BadRequest("File data is empty".to_string()));
    }

    let extension = media::extension_or(file.filename.as_deref(), "jpg");
    if !media::is_image_extension(&extension) {
        return Err(AppError::Validation(format!(
            "Unsupported image type: .{}",
            extension
        )));
    }

    fs::create_dir_all(&data.paths.uploads_dir)?;
    let filename = format!("{}.{}", data.ids.next_millis(), extension);
    let target = data.paths.uploads_dir.join(&filename);
    fs::write(&target, &file.data)?;

    tracing::info!(
        path = %target.display(),
        bytes = file.data.len(),
        "Saved uploaded image"
    );

    Ok(HttpResponse::Ok().json(ImageUploadResponse {
        success: true,
        image_path: format!("{}{}", UPLOADS_PREFIX, filename),
    }))
}

fn serve_image(req: &HttpRequest, path: &Path) -> AppResult<HttpResponse> {
    let file = NamedFile::open(path)?;
    let mut response = file.into_response(req);

    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(media::image_content_type(path)),
    );
    // Upload names are never reused, so the content is immutable.
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000"),
    );

    Ok(response)
}

fn lookup(data: &AppState, filename: &str) -> AppResult<std::path::PathBuf> {
    media::resolve(
        &data.paths.uploads_dir,
        &data.paths.public_uploads_dir(),
        filename,
    )
}

/// GET /uploads/{filename}
#[get("/uploads/{filename}")]
pub async fn get_upload(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let file_path = lookup(&data, &path)?;
    serve_image(&req, &file_path)
}

/// Query-string form of [`get_upload`].
///
/// GET /api/uploads?filename=
#[get("/api/uploads")]
pub async fn get_upload_by_query(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<FilenameQuery>,
) -> AppResult<HttpResponse> {
    let filename = query
        .filename
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing filename parameter".to_string()))?;
    let file_path = lookup(&data, filename)?;
    serve_image(&req, &file_path)
}

/// Configure upload routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_image)
        .service(get_upload)
        .service(get_upload_by_query);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{json_config, query_config};
    use crate::api::testing::{multipart_body, state_in};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(json_config())
                    .app_data(query_config())
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_rt::test]
    async fn test_upload_then_serve() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(state_in(dir.path()));

        let (content_type, body) = multipart_body(&[("image", Some("moon.PNG"), "PNG-data")]);
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let uploaded: Value = test::read_body_json(resp).await;
        let image_path = uploaded["imagePath"].as_str().unwrap().to_string();
        assert!(image_path.starts_with("/uploads/"));
        assert!(image_path.ends_with(".png"));

        let req = test::TestRequest::get().uri(&image_path).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/png");
        assert_eq!(
            resp.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=31536000"
        );
        let bytes = test::read_body(resp).await;
        assert_eq!(&bytes[..], b"PNG-data");
    }

    #[actix_rt::test]
    async fn test_upload_rejects_missing_or_unsupported_image() {
        let dir = tempfile::tempdir().unwrap();
        let app = app!(state_in(dir.path()));

        let (content_type, body) = multipart_body(&[("title", None, "no file here")]);
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let (content_type, body) = multipart_body(&[("image", Some("script.sh"), "#!/bin/sh")]);
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[actix_rt::test]
    async fn test_upload_over_limit_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state_in(dir.path());
        state.max_upload_bytes = 4;
        let uploads_dir = state.paths.uploads_dir.clone();
        let app = app!(state);

        let (content_type, body) = multipart_body(&[("image", Some("big.png"), "PNG-data")]);
        let req = test::TestRequest::post()
            .uri("/api/upload")
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(body)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "PAYLOAD_TOO_LARGE");
        assert_eq!(fs::read_dir(&uploads_dir).unwrap().count(), 0);
    }

    #[actix_rt::test]
    async fn test_serve_falls_back_to_public_uploads() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_in(dir.path());
        fs::create_dir_all(state.paths.public_uploads_dir()).unwrap();
        fs::write(state.paths.public_uploads_dir().join("old.jpg"), b"jpeg").unwrap();
        let app = app!(state);

        let req = test::TestRequest::get()
            .uri("/api/uploads?filename=old.jpg")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "image/jpeg");

        let req = test::TestRequest::get()
            .uri("/api/uploads?filename=..%2Fsecret")
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );

        let req = test::TestRequest::get().uri("/uploads/missing.jpg").to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::NOT_FOUND
        );
    }
}
