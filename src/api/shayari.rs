//! Shayari API endpoints.

use actix_web::{delete, get, patch, post, web, HttpResponse};

use crate::error::{AppError, AppResult, OptionExt};
use crate::models::{ApiResponse, AppState, DeleteRequest, MessageResponse};
use crate::store::shayari::{NewShayari, SearchCriteria, ShayariPatch};

/// List every entry.
///
/// GET /api/shayari
///
/// Returns a bare JSON array in file order.
#[get("/api/shayari")]
pub async fn list_shayari(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    let entries = data.shayari.list_all()?;
    tracing::debug!(count = entries.len(), "Listing shayari");
    Ok(HttpResponse::Ok().json(entries))
}

/// Search entries by mood and/or text.
///
/// GET /api/shayari/search
///
/// Query parameters:
/// - `mood`: case-insensitive substring of the mood
/// - `text`: case-insensitive substring of the text
#[get("/api/shayari/search")]
pub async fn search_shayari(
    data: web::Data<AppState>,
    query: web::Query<SearchCriteria>,
) -> AppResult<HttpResponse> {
    if query.is_empty() {
        return Err(AppError::BadRequest(
            "At least one search parameter (mood or text) is required".to_string(),
        ));
    }

    let results = data.shayari.search(&query)?;
    let count = results.len();
    tracing::debug!(mood = ?query.mood, text = ?query.text, count, "Searched shayari");

    Ok(HttpResponse::Ok().json(
        ApiResponse::ok(results)
            .with_count(count)
            .with_message(format!("Found {} matching shayari entries", count)),
    ))
}

/// GET /api/shayari/stats
#[get("/api/shayari/stats")]
pub async fn shayari_stats(data: web::Data<AppState>) -> AppResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::ok(data.shayari.stats()?)))
}

/// GET /api/shayari/{id}
#[get("/api/shayari/{id}")]
pub async fn get_shayari(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    let entry = data
        .shayari
        .find_by_id(&id)?
        .ok_or_not_found(format!("Shayari with ID {} not found", id))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(entry)))
}

/// Create an entry.
///
/// POST /api/shayari
#[post("/api/shayari")]
pub async fn create_shayari(
    data: web::Data<AppState>,
    body: web::Json<NewShayari>,
) -> AppResult<HttpResponse> {
    let entry = data.shayari.create(body.into_inner())?;

    Ok(HttpResponse::Created()
        .json(ApiResponse::ok(entry).with_message("Shayari added successfully")))
}

/// Update an entry; fields left out keep their value.
///
/// PATCH /api/shayari/{id}
#[patch("/api/shayari/{id}")]
pub async fn update_shayari(
    data: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<ShayariPatch>,
) -> AppResult<HttpResponse> {
    let entry = data.shayari.update(&path, body.into_inner())?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(entry).with_message("Shayari updated successfully")))
}

fn delete_by_id(data: &AppState, id: &str) -> AppResult<HttpResponse> {
    if id.trim().is_empty() {
        return Err(AppError::BadRequest("Shayari ID is required".to_string()));
    }

    if !data.shayari.delete(id)? {
        return Err(AppError::shayari_not_found(id));
    }

    Ok(HttpResponse::Ok().json(MessageResponse::new("Shayari deleted successfully")))
}

/// Delete an entry named in the JSON body.
///
/// DELETE /api/shayari
#[delete("/api/shayari")]
pub async fn delete_shayari(
    data: web::Data<AppState>,
    body: web::Json<DeleteRequest>,
) -> AppResult<HttpResponse> {
    delete_by_id(&data, body.id.as_deref().unwrap_or_default())
}

/// DELETE /api/shayari/{id}
#[delete("/api/shayari/{id}")]
pub async fn delete_shayari_by_path(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    delete_by_id(&data, &path)
}

/// Configure shayari routes.
///
/// Fixed paths are registered before `{id}` so they are not captured by it.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_shayari)
        .service(search_shayari)
        .service(shayari_stats)
        .service(create_shayari)
        .service(delete_shayari)
        .service(get_shayari)
        .service(update_shayari)
        .service(delete_shayari_by_path);
}
