//! Error taxonomy shared by the store, the lookup client and the service.

use actix_web::http::StatusCode;

/// Failures from the song info lookup API.
#[derive(Debug, thiserror::Error)]
pub enum DetailsError {
    /// Upstream answered 400.
    #[error("bad request")]
    BadRequest,
    /// Upstream answered 500.
    #[error("internal server error")]
    Internal,
    /// Transport failure, unexpected status or undecodable body.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Domain errors surfaced by song operations.
#[derive(Debug, thiserror::Error)]
pub enum SongError {
    #[error("song already exists")]
    AlreadyExists,
    #[error("song not found")]
    NotFound,
    #[error("invalid date format")]
    InvalidDateFormat,
    #[error("invalid verse number")]
    InvalidVerseNumber,
    #[error("update data is empty")]
    EmptyUpdate,
    #[error("song details lookup failed: {0}")]
    Details(#[from] DetailsError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SongError {
    /// Fixed HTTP status for each condition.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SongError::AlreadyExists
            | SongError::InvalidDateFormat
            | SongError::InvalidVerseNumber
            | SongError::EmptyUpdate => StatusCode::BAD_REQUEST,
            SongError::NotFound => StatusCode::NOT_FOUND,
            SongError::Details(_) | SongError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
