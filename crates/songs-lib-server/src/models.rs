//! Song records and API models.
//!
//! Defines the persisted song shape plus request/response structures for the
//! songs API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const STATUS_OK: &str = "OK";
pub const STATUS_ERROR: &str = "Error";

/// A stored song.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Store-assigned identifier.
    pub id: i64,
    /// Performing group.
    pub group: String,
    /// Song title.
    pub song: String,
    /// Release date as `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub release_date: String,
    /// Full lyrics; verses are separated by blank lines.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    /// External link for the song.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub link: String,
}

/// A song ready to be inserted (no id yet).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSong {
    pub group: String,
    pub song: String,
    pub release_date: String,
    pub text: String,
    pub link: String,
}

/// Metadata returned by the song info lookup API.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongDetails {
    /// Release date as `DD.MM.YYYY`.
    #[serde(default)]
    pub release_date: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub link: String,
}

/// Partial update; `None` leaves a field unchanged, `Some("")` clears it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub song: Option<String>,
    /// Release date as `DD.MM.YYYY`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl SongPatch {
    pub fn is_empty(&self) -> bool {
        self.group.is_none()
            && self.song.is_none()
            && self.release_date.is_none()
            && self.text.is_none()
            && self.link.is_none()
    }
}

/// Listing constraints plus 1-indexed pagination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SongFilter {
    pub group: Option<String>,
    pub song: Option<String>,
    pub release_date: Option<String>,
    pub page: u32,
    pub per_page: u32,
}

impl SongFilter {
    /// Row offset of the first song on the requested page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page.saturating_sub(1)) * i64::from(self.per_page)
    }
}

/// Request payload for `POST /songs`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SaveSongRequest {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub song: String,
}

impl SaveSongRequest {
    /// Messages for missing required fields; empty when the request is valid.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.group.trim().is_empty() {
            errors.push("field group is a required field".to_string());
        }
        if self.song.trim().is_empty() {
            errors.push("field song is a required field".to_string());
        }
        errors
    }
}

/// Bare status response.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK.to_string(),
        }
    }
}

/// Error response body.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_ERROR.to_string(),
            error: message.into(),
        }
    }
}

/// Response for a created song.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SaveSongResponse {
    pub status: String,
    pub id: i64,
}

/// Response for a song listing.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SongsResponse {
    pub status: String,
    pub songs: Vec<Song>,
}

/// Response for a single verse.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct TextResponse {
    pub status: String,
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_distinguishes_absent_from_empty() {
        let patch: SongPatch = serde_json::from_str(r#"{"link": ""}"#).unwrap();
        assert_eq!(patch.link.as_deref(), Some(""));
        assert!(patch.group.is_none());
        assert!(!patch.is_empty());

        let patch: SongPatch = serde_json::from_str(r#"{"group": null}"#).unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn patch_reads_camel_case_release_date() {
        let patch: SongPatch = serde_json::from_str(r#"{"releaseDate": "16.07.2006"}"#).unwrap();
        assert_eq!(patch.release_date.as_deref(), Some("16.07.2006"));
    }

    #[test]
    fn song_serializes_with_api_field_names() {
        let song = Song {
            id: 3,
            group: "Muse".to_string(),
            song: "Supermassive Black Hole".to_string(),
            release_date: "2006-07-16".to_string(),
            text: String::new(),
            link: "https://example.com".to_string(),
        };
        let value = serde_json::to_value(&song).unwrap();
        assert_eq!(value["releaseDate"], "2006-07-16");
        assert!(value.get("text").is_none());
        assert_eq!(value["id"], 3);
    }

    #[test]
    fn offset_is_zero_based_from_page() {
        let filter = SongFilter {
            group: None,
            song: None,
            release_date: None,
            page: 3,
            per_page: 20,
        };
        assert_eq!(filter.offset(), 40);
        assert_eq!(SongFilter { page: 1, ..filter.clone() }.offset(), 0);
        assert_eq!(SongFilter { page: 0, ..filter }.offset(), 0);
    }

    #[test]
    fn save_request_requires_both_fields() {
        let req = SaveSongRequest::default();
        assert_eq!(
            req.validation_errors(),
            vec![
                "field group is a required field".to_string(),
                "field song is a required field".to_string()
            ]
        );
        let req = SaveSongRequest {
            group: "Muse".to_string(),
            song: "Uprising".to_string(),
        };
        assert!(req.validation_errors().is_empty());
    }
}
