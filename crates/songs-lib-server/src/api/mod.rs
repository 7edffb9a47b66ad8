//! HTTP API handlers.
//!
//! Defines the Actix routes for song CRUD, verse lookup, and health.

pub mod health;
pub mod songs;

pub use songs::{delete_song, list_songs, save_song, song_text, update_song};

use actix_web::http::StatusCode;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use serde::de::DeserializeOwned;

use crate::error::SongError;
use crate::models::ErrorResponse;
use crate::startup::RequestId;

/// JSON error body with the given status.
pub(crate) fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(ErrorResponse::new(message))
}

/// Request id assigned by the logging middleware, or `-` outside it.
pub(crate) fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_else(|| "-".to_string())
}

/// Decode a JSON body, answering 400 for empty or malformed payloads.
pub(crate) fn decode_body<T: DeserializeOwned>(
    op: &str,
    request_id: &str,
    body: &[u8],
) -> Result<T, HttpResponse> {
    if body.iter().all(u8::is_ascii_whitespace) {
        tracing::info!(op, request_id, "empty request body");
        return Err(error_response(StatusCode::BAD_REQUEST, "empty request"));
    }
    serde_json::from_slice(body).map_err(|err| {
        tracing::info!(op, request_id, error = %err, "failed to decode request body");
        error_response(StatusCode::BAD_REQUEST, "failed to decode request")
    })
}

/// Run a store/lookup call on the blocking pool.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, SongError>
where
    F: FnOnce() -> Result<T, SongError> + Send + 'static,
    T: Send + 'static,
{
    web::block(f)
        .await
        .map_err(|err| SongError::Other(anyhow::anyhow!("blocking task failed: {err}")))?
}
