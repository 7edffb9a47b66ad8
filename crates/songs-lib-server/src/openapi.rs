use utoipa::OpenApi;

use crate::api;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health,
        api::songs::save_song,
        api::songs::update_song,
        api::songs::delete_song,
        api::songs::list_songs,
        api::songs::song_text,
    ),
    components(
        schemas(
            models::Song,
            models::SongPatch,
            models::SaveSongRequest,
            models::SaveSongResponse,
            models::SongsResponse,
            models::TextResponse,
            models::StatusResponse,
            models::ErrorResponse,
            api::health::HealthResponse,
        )
    ),
    tags(
        (name = "songs-lib-server", description = "Song library API")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_song_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/songs"));
        assert!(paths.iter().any(|p| p.as_str() == "/songs/{id}"));
        assert!(paths.iter().any(|p| p.as_str() == "/health"));
    }
}
