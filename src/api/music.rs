//! Music API endpoints.

use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::{
    get,
    http::header::{self, HeaderValue},
    post, web, HttpRequest, HttpResponse,
};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::media;
use crate::models::{ApiResponse, AppState, ListTracksQuery, SourcesQuery, StreamQuery};
use crate::playback::{PlaybackPlan, SupportedFormats};
use crate::store::Track;

const DEFAULT_TITLE: &str = "Untitled";
const DEFAULT_ARTIST: &str = "Unknown Artist";

/// Upload a track into the library.
///
/// POST /api/music/upload
///
/// Multipart fields: `file` (required), `title`, `artist`, `mood`.
/// Missing title/artist are taken from the file's tags when present.
#[post("/api/music/upload")]
pub async fn upload_music(
    data: web::Data<AppState>,
    payload: Multipart,
) -> AppResult<HttpResponse> {
    let mut form = media::read_form(payload, data.max_upload_bytes).await?;
    if form.is_empty() {
        return Err(AppError::BadRequest("No file uploaded".to_string()));
    }

    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::BadRequest("No music file found in request".to_string()))?;
    if file.data.is_empty() {
        return Err(AppError::BadRequest("File data is empty".to_string()));
    }

    let extension = media::extension_or(file.filename.as_deref(), "mp3");
    if !media::is_audio_extension(&extension) {
        return Err(AppError::Validation(format!(
            "Unsupported audio type: .{}",
            extension
        )));
    }

    let music_dir = data.library.music_dir();
    fs::create_dir_all(music_dir)?;

    // Write under a provisional name first so the tags can be read.
    let stamp = data.ids.next_millis();
    let staging = music_dir.join(format!("{}.upload.{}", stamp, extension));
    fs::write(&staging, &file.data)?;
    let tags = media::probe_tags(&staging);

    let title = form
        .text("title")
        .map(str::to_string)
        .or(tags.title)
        .unwrap_or_else(|| DEFAULT_TITLE.to_string());
    let artist = form
        .text("artist")
        .map(str::to_string)
        .or(tags.artist)
        .unwrap_or_else(|| DEFAULT_ARTIST.to_string());
    let mood = form.text("mood").unwrap_or_default().to_string();

    let filename = format!("{}_{}.{}", stamp, media::slugify(&title), extension);
    let target = music_dir.join(&filename);
    if let Err(e) = fs::rename(&staging, &target) {
        let _ = fs::remove_file(&staging);
        return Err(e.into());
    }

    let mut track = Track::new(stamp.to_string(), title, artist, mood, filename);
    track.duration = tags.duration;
    let track = match data.library.add(track) {
        Ok(track) => track,
        Err(e) => {
            let _ = fs::remove_file(&target);
            return Err(e);
        }
    };

    tracing::info!(
        id = %track.id,
        path = %target.display(),
        bytes = file.data.len(),
        "Saved uploaded music"
    );

    Ok(HttpResponse::Created().json(ApiResponse::ok(track)))
}

/// List the library.
///
/// GET /api/music/list
///
/// Query parameters:
/// - `mood`: case-insensitive substring filter on the track mood
#[get("/api/music/list")]
pub async fn list_music(
    data: web::Data<AppState>,
    query: web::Query<ListTracksQuery>,
) -> AppResult<HttpResponse> {
    let tracks = data.library.list(query.mood.as_deref());
    Ok(HttpResponse::Ok().json(ApiResponse::ok(tracks)))
}

fn locate(data: &AppState, filename: &str) -> AppResult<PathBuf> {
    media::resolve(
        data.library.music_dir(),
        &data.paths.public_music_dir(),
        filename,
    )
}

fn serve_audio(req: &HttpRequest, path: &Path) -> AppResult<HttpResponse> {
    let file = NamedFile::open(path)?;
    let mut response = file.into_response(req);
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(media::audio_content_type(path)),
    );
    Ok(response)
}

/// Stream an audio file.
///
/// GET /api/music/stream?filename=&format=
///
/// `format` selects a sibling file with the same name and that extension
/// when one exists. Supports range requests for seeking.
#[get("/api/music/stream")]
pub async fn stream_music(
    req: HttpRequest,
    data: web::Data<AppState>,
    query: web::Query<StreamQuery>,
) -> AppResult<HttpResponse> {
    let filename = query
        .filename
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Filename parameter is required".to_string()))?;

    let mut file_path = locate(&data, filename)?;
    if let Some(format) = query.format.as_deref() {
        if let Some(variant) = media::format_variant(&file_path, format) {
            tracing::debug!(variant = %variant.display(), "Serving requested format");
            file_path = variant;
        }
    }

    serve_audio(&req, &file_path)
}

/// Playback fallback plan for a track.
///
/// GET /api/music/{id}/sources?formats=mp3,ogg&start=0&interacted=true
///
/// After trying a source the client may add `attempt=<index>&outcome=<outcome>`
/// to learn what to do next. Outcomes: `playing`, `notAllowed`, `aborted`,
/// `notSupported`, `timedOut`, `failed`.
#[get("/api/music/{id}/sources")]
pub async fn track_sources(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<SourcesQuery>,
) -> AppResult<HttpResponse> {
    let track = data
        .library
        .find_by_id(&path)
        .ok_or_else(|| AppError::track_not_found(&path))?;

    let plan = PlaybackPlan::for_track(
        &track,
        SupportedFormats::parse(&query.formats),
        query.start,
        query.interacted,
        query.report()?,
    )?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(plan)))
}

/// Serve an audio file by name.
///
/// GET /api/music/{filename}
#[get("/api/music/{filename}")]
pub async fn get_music_file(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let file_path = locate(&data, &path)?;
    serve_audio(&req, &file_path)
}

/// Legacy alias of [`get_music_file`].
///
/// GET /music/{filename}
#[get("/music/{filename}")]
pub async fn get_music_file_legacy(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let file_path = locate(&data, &path)?;
    serve_audio(&req, &file_path)
}

/// Configure music routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(upload_music)
        .service(list_music)
        .service(stream_music)
        .service(track_sources)
        .service(get_music_file)
        .service(get_music_file_legacy);
}
