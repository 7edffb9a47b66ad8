//! Song CRUD and verse lookup handlers.

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, delete, get, patch, post, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::api::{decode_body, error_response, request_id, run_blocking};
use crate::error::SongError;
use crate::models::{
    ErrorResponse, STATUS_OK, SaveSongRequest, SaveSongResponse, SongFilter, SongPatch,
    SongsResponse, StatusResponse, TextResponse,
};
use crate::state::AppState;

/// Listing filters and pagination.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListSongsQuery {
    /// Exact group name.
    pub group: Option<String>,
    /// Exact song title.
    pub song: Option<String>,
    /// Release date as `DD.MM.YYYY`.
    #[serde(rename = "releaseDate")]
    pub release_date: Option<String>,
    /// 1-indexed page, defaults to 1.
    pub page: Option<String>,
    /// Page size, capped at the configured limit.
    pub per_page: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerseQuery {
    /// 1-indexed verse number.
    pub verse: Option<String>,
}

/// Parse a positive page parameter, falling back to `default`.
fn page_param(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value >= 1)
        .unwrap_or(default)
}

fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// Log a failed operation at a level matching its class and build the body.
fn failure(op: &str, request_id: &str, err: &SongError, status: StatusCode, message: &str) -> HttpResponse {
    if status.is_server_error() {
        tracing::error!(op, request_id, error = %err, "request failed");
    } else {
        tracing::info!(op, request_id, error = %err, "request rejected");
    }
    error_response(status, message)
}

/// Create a song, enriching it from the lookup API.
#[utoipa::path(
    post,
    path = "/songs",
    request_body = SaveSongRequest,
    responses(
        (status = 200, description = "Song created", body = SaveSongResponse),
        (status = 400, description = "Invalid request or duplicate song", body = ErrorResponse),
        (status = 500, description = "Lookup or store failure", body = ErrorResponse)
    )
)]
#[post("/songs")]
pub async fn save_song(state: web::Data<AppState>, req: HttpRequest, body: web::Bytes) -> impl Responder {
    const OP: &str = "songs.save";
    let request_id = request_id(&req);

    let request: SaveSongRequest = match decode_body(OP, &request_id, &body) {
        Ok(request) => request,
        Err(resp) => return resp,
    };
    let missing = request.validation_errors();
    if !missing.is_empty() {
        tracing::info!(op = OP, request_id = %request_id, "missing required fields");
        return error_response(StatusCode::BAD_REQUEST, &missing.join(", "));
    }

    let songs = state.songs.clone();
    let SaveSongRequest { group, song } = request;
    match run_blocking(move || songs.save_song(&group, &song)).await {
        Ok(id) => {
            tracing::info!(op = OP, request_id = %request_id, id, "song created");
            HttpResponse::Ok().json(SaveSongResponse {
                status: STATUS_OK.to_string(),
                id,
            })
        }
        Err(err) => {
            let (status, message) = match &err {
                SongError::AlreadyExists => (StatusCode::BAD_REQUEST, "song already exists"),
                // The date came from the lookup API, not from the client.
                SongError::InvalidDateFormat => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "external api returned invalid date",
                ),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "failed to add song"),
            };
            failure(OP, &request_id, &err, status, message)
        }
    }
}

/// Apply a partial update to a song.
#[utoipa::path(
    patch,
    path = "/songs/{id}",
    params(("id" = i64, Path, description = "Song id")),
    request_body = SongPatch,
    responses(
        (status = 200, description = "Song updated", body = StatusResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Song not found", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[patch("/songs/{id}")]
pub async fn update_song(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Bytes,
) -> impl Responder {
    const OP: &str = "songs.update";
    let request_id = request_id(&req);

    let Some(id) = parse_id(&path) else {
        tracing::info!(op = OP, request_id = %request_id, id = %path.as_str(), "invalid id");
        return error_response(StatusCode::BAD_REQUEST, "invalid id format");
    };
    let patch: SongPatch = match decode_body(OP, &request_id, &body) {
        Ok(patch) => patch,
        Err(resp) => return resp,
    };

    let songs = state.songs.clone();
    match run_blocking(move || songs.update_song(id, patch)).await {
        Ok(()) => {
            tracing::info!(op = OP, request_id = %request_id, id, "song updated");
            HttpResponse::Ok().json(StatusResponse::ok())
        }
        Err(err) => {
            let message = match &err {
                SongError::NotFound => "song not found",
                SongError::AlreadyExists => "song already exists",
                SongError::EmptyUpdate => "empty update request",
                SongError::InvalidDateFormat => "invalid date format for update",
                _ => "failed to update song",
            };
            failure(OP, &request_id, &err, err.status_code(), message)
        }
    }
}

/// Delete a song.
#[utoipa::path(
    delete,
    path = "/songs/{id}",
    params(("id" = i64, Path, description = "Song id")),
    responses(
        (status = 200, description = "Song deleted", body = StatusResponse),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = 404, description = "Song not found", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[delete("/songs/{id}")]
pub async fn delete_song(state: web::Data<AppState>, req: HttpRequest, path: web::Path<String>) -> impl Responder {
    const OP: &str = "songs.delete";
    let request_id = request_id(&req);

    let Some(id) = parse_id(&path) else {
        tracing::info!(op = OP, request_id = %request_id, id = %path.as_str(), "invalid id");
        return error_response(StatusCode::BAD_REQUEST, "invalid id format");
    };

    let songs = state.songs.clone();
    match run_blocking(move || songs.delete_song(id)).await {
        Ok(()) => {
            tracing::info!(op = OP, request_id = %request_id, id, "song deleted");
            HttpResponse::Ok().json(StatusResponse::ok())
        }
        Err(err) => {
            let message = match &err {
                SongError::NotFound => "song not found",
                _ => "failed to delete song",
            };
            failure(OP, &request_id, &err, err.status_code(), message)
        }
    }
}

/// List songs with optional exact-match filters.
#[utoipa::path(
    get,
    path = "/songs",
    params(ListSongsQuery),
    responses(
        (status = 200, description = "Matching songs, newest first", body = SongsResponse),
        (status = 400, description = "Invalid filter", body = ErrorResponse),
        (status = 404, description = "No songs matched", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[get("/songs")]
pub async fn list_songs(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<ListSongsQuery>,
) -> impl Responder {
    const OP: &str = "songs.list";
    let request_id = request_id(&req);
    let query = query.into_inner();

    let limit = state.page_size_limit;
    let filter = SongFilter {
        group: query.group,
        song: query.song,
        release_date: query.release_date,
        page: page_param(query.page.as_deref(), 1),
        per_page: page_param(query.per_page.as_deref(), limit).min(limit),
    };
    tracing::debug!(op = OP, request_id = %request_id, filter = ?filter, "listing songs");

    let songs = state.songs.clone();
    match run_blocking(move || songs.songs(filter)).await {
        Ok(songs) => {
            tracing::info!(op = OP, request_id = %request_id, count = songs.len(), "songs listed");
            HttpResponse::Ok().json(SongsResponse {
                status: STATUS_OK.to_string(),
                songs,
            })
        }
        Err(err) => {
            let message = match &err {
                SongError::NotFound => "songs not found",
                SongError::InvalidDateFormat => "invalid date format",
                _ => "failed to find songs",
            };
            failure(OP, &request_id, &err, err.status_code(), message)
        }
    }
}

/// Return one verse of a song's lyrics.
#[utoipa::path(
    get,
    path = "/songs/{id}",
    params(("id" = i64, Path, description = "Song id"), VerseQuery),
    responses(
        (status = 200, description = "Requested verse", body = TextResponse),
        (status = 400, description = "Invalid id or verse", body = ErrorResponse),
        (status = 404, description = "Song not found", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
#[get("/songs/{id}")]
pub async fn song_text(
    state: web::Data<AppState>,
    req: HttpRequest,
    path: web::Path<String>,
    query: web::Query<VerseQuery>,
) -> impl Responder {
    const OP: &str = "songs.text";
    let request_id = request_id(&req);

    let Some(id) = parse_id(&path) else {
        tracing::info!(op = OP, request_id = %request_id, id = %path.as_str(), "invalid id");
        return error_response(StatusCode::BAD_REQUEST, "invalid id format");
    };
    let Some(verse) = query.verse.as_deref().and_then(|v| v.trim().parse::<i64>().ok()) else {
        tracing::info!(op = OP, request_id = %request_id, "invalid verse");
        return error_response(StatusCode::BAD_REQUEST, "invalid verse number format");
    };

    let songs = state.songs.clone();
    match run_blocking(move || songs.text(id, verse)).await {
        Ok(text) => HttpResponse::Ok().json(TextResponse {
            status: STATUS_OK.to_string(),
            text,
        }),
        Err(err) => {
            let message = match &err {
                SongError::NotFound => "song not found",
                SongError::InvalidVerseNumber => "invalid verse parameter",
                _ => "failed to find song text",
            };
            failure(OP, &request_id, &err, err.status_code(), message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_param_falls_back_on_bad_values() {
        assert_eq!(page_param(None, 20), 20);
        assert_eq!(page_param(Some("3"), 20), 3);
        assert_eq!(page_param(Some("0"), 20), 20);
        assert_eq!(page_param(Some("-2"), 20), 20);
        assert_eq!(page_param(Some("abc"), 1), 1);
    }

    #[test]
    fn parse_id_rejects_non_numeric() {
        assert_eq!(parse_id("42"), Some(42));
        assert_eq!(parse_id("4x"), None);
        assert_eq!(parse_id(""), None);
    }
}
