//! Shared application state.

use crate::song_service::SongService;

/// State handed to every handler through `web::Data`.
pub struct AppState {
    pub songs: SongService,
    /// Upper bound and default for `per_page`.
    pub page_size_limit: u32,
}

impl AppState {
    pub fn new(songs: SongService, page_size_limit: u32) -> Self {
        Self {
            songs,
            page_size_limit,
        }
    }
}
