//! Song business rules: enrichment on create, date normalization, filter
//! cleanup and verse extraction.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::error::{DetailsError, SongError};
use crate::models::{NewSong, Song, SongDetails, SongFilter, SongPatch};

/// Date format accepted from clients and the lookup API.
const INPUT_DATE_FORMAT: &str = "%d.%m.%Y";
/// Date format persisted by the store.
const STORED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Persistence contract for songs.
pub trait SongRepository: Send + Sync {
    /// Insert a song and return its id.
    fn save_song(&self, song: &NewSong) -> Result<i64, SongError>;
    /// Filtered, paginated listing, newest first. Empty results are `NotFound`.
    fn songs(&self, filter: &SongFilter) -> Result<Vec<Song>, SongError>;
    /// Full lyrics for one song.
    fn text(&self, id: i64) -> Result<String, SongError>;
    fn update_song(&self, id: i64, patch: &SongPatch) -> Result<(), SongError>;
    fn delete_song(&self, id: i64) -> Result<(), SongError>;
    /// Cheap liveness probe.
    fn ping(&self) -> Result<(), SongError>;
}

/// Source of song metadata used to enrich new songs.
pub trait SongDetailsProvider: Send + Sync {
    fn fetch_song_details(&self, group: &str, song: &str) -> Result<SongDetails, DetailsError>;
}

#[derive(Clone)]
pub struct SongService {
    store: Arc<dyn SongRepository>,
    details: Arc<dyn SongDetailsProvider>,
}

impl SongService {
    pub fn new(store: Arc<dyn SongRepository>, details: Arc<dyn SongDetailsProvider>) -> Self {
        Self { store, details }
    }

    /// Look up metadata for `group`/`song`, normalize it and persist the song.
    pub fn save_song(&self, group: &str, song: &str) -> Result<i64, SongError> {
        let details = self.details.fetch_song_details(group, song)?;
        let release_date = normalize_date(&details.release_date)?;
        let record = NewSong {
            group: group.to_string(),
            song: song.to_string(),
            release_date,
            text: details.text,
            link: details.link,
        };
        self.store.save_song(&record)
    }

    pub fn update_song(&self, id: i64, mut patch: SongPatch) -> Result<(), SongError> {
        if patch.is_empty() {
            return Err(SongError::EmptyUpdate);
        }
        if let Some(date) = patch.release_date.as_deref() {
            patch.release_date = Some(normalize_date(date)?);
        }
        self.store.update_song(id, &patch)
    }

    pub fn songs(&self, mut filter: SongFilter) -> Result<Vec<Song>, SongError> {
        filter.group = non_blank(filter.group);
        filter.song = non_blank(filter.song);
        filter.release_date = non_blank(filter.release_date)
            .map(|date| normalize_date(&date))
            .transpose()?;
        self.store.songs(&filter)
    }

    /// Return the 1-indexed verse of a song's lyrics.
    pub fn text(&self, id: i64, verse: i64) -> Result<String, SongError> {
        if verse < 1 {
            return Err(SongError::InvalidVerseNumber);
        }
        let text = self.store.text(id)?;
        let index = usize::try_from(verse - 1).map_err(|_| SongError::InvalidVerseNumber)?;
        split_verses(&text)
            .into_iter()
            .nth(index)
            .ok_or(SongError::InvalidVerseNumber)
    }

    pub fn delete_song(&self, id: i64) -> Result<(), SongError> {
        self.store.delete_song(id)
    }

    pub fn ping(&self) -> Result<(), SongError> {
        self.store.ping()
    }
}

/// Convert `DD.MM.YYYY` to `YYYY-MM-DD`.
///
/// Only the zero-padded form is accepted, so `1.2.2006` is rejected.
pub fn normalize_date(raw: &str) -> Result<String, SongError> {
    let date = NaiveDate::parse_from_str(raw, INPUT_DATE_FORMAT)
        .map_err(|_| SongError::InvalidDateFormat)?;
    if date.format(INPUT_DATE_FORMAT).to_string() != raw {
        return Err(SongError::InvalidDateFormat);
    }
    Ok(date.format(STORED_DATE_FORMAT).to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Split lyrics into verses: runs of non-blank lines separated by one or
/// more blank lines.
pub fn split_verses(text: &str) -> Vec<String> {
    let mut verses = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in text.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                verses.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        verses.push(current.join("\n"));
    }
    verses
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeStore {
        songs: Mutex<Vec<Song>>,
        filters: Mutex<Vec<SongFilter>>,
        patches: Mutex<Vec<(i64, SongPatch)>>,
    }

    impl SongRepository for FakeStore {
        fn save_song(&self, song: &NewSong) -> Result<i64, SongError> {
            let mut songs = self.songs.lock().unwrap();
            if songs.iter().any(|s| s.group == song.group && s.song == song.song) {
                return Err(SongError::AlreadyExists);
            }
            let id = songs.len() as i64 + 1;
            songs.push(Song {
                id,
                group: song.group.clone(),
                song: song.song.clone(),
                release_date: song.release_date.clone(),
                text: song.text.clone(),
                link: song.link.clone(),
            });
            Ok(id)
        }

        fn songs(&self, filter: &SongFilter) -> Result<Vec<Song>, SongError> {
            self.filters.lock().unwrap().push(filter.clone());
            let songs = self.songs.lock().unwrap().clone();
            if songs.is_empty() {
                return Err(SongError::NotFound);
            }
            Ok(songs)
        }

        fn text(&self, id: i64) -> Result<String, SongError> {
            self.songs
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == id)
                .map(|s| s.text.clone())
                .ok_or(SongError::NotFound)
        }

        fn update_song(&self, id: i64, patch: &SongPatch) -> Result<(), SongError> {
            self.patches.lock().unwrap().push((id, patch.clone()));
            Ok(())
        }

        fn delete_song(&self, _id: i64) -> Result<(), SongError> {
            Err(SongError::NotFound)
        }

        fn ping(&self) -> Result<(), SongError> {
            Ok(())
        }
    }

    enum FakeDetails {
        Found(SongDetails),
        Fails(fn() -> DetailsError),
    }

    impl SongDetailsProvider for FakeDetails {
        fn fetch_song_details(&self, _group: &str, _song: &str) -> Result<SongDetails, DetailsError> {
            match self {
                FakeDetails::Found(details) => Ok(details.clone()),
                FakeDetails::Fails(make) => Err(make()),
            }
        }
    }

    fn details(release_date: &str) -> FakeDetails {
        FakeDetails::Found(SongDetails {
            release_date: release_date.to_string(),
            text: "Ooh baby, don't you know I suffer?\nOoh baby, can you hear me moan?\n\nYou caught me under false pretenses".to_string(),
            link: "https://www.youtube.com/watch?v=Xsp3_a-PMTw".to_string(),
        })
    }

    fn build(details: FakeDetails) -> (Arc<FakeStore>, SongService) {
        let store = Arc::new(FakeStore::default());
        let service = SongService::new(store.clone(), Arc::new(details));
        (store, service)
    }

    fn store_with_lyrics(text: &str) -> (Arc<FakeStore>, SongService, i64) {
        let (store, service) = build(details("16.07.2006"));
        let id = store
            .save_song(&NewSong {
                group: "Muse".to_string(),
                song: "Hysteria".to_string(),
                release_date: "2003-12-01".to_string(),
                text: text.to_string(),
                link: String::new(),
            })
            .unwrap();
        (store, service, id)
    }

    fn blank_filter(value: Option<&str>) -> SongFilter {
        SongFilter {
            group: value.map(str::to_string),
            song: value.map(str::to_string),
            release_date: value.map(str::to_string),
            page: 1,
            per_page: 10,
        }
    }

    #[test]
    fn normalize_date_reorders_components() {
        assert_eq!(normalize_date("16.07.2006").unwrap(), "2006-07-16");
        assert_eq!(normalize_date("29.02.2024").unwrap(), "2024-02-29");
    }

    #[test]
    fn normalize_date_rejects_other_shapes() {
        for raw in ["2006-07-16", "16/07/2006", "1.7.2006", "31.02.2006", "", "16.07.2006 "] {
            assert!(
                matches!(normalize_date(raw), Err(SongError::InvalidDateFormat)),
                "accepted {raw:?}"
            );
        }
    }

    #[test]
    fn split_verses_groups_paragraphs() {
        assert_eq!(split_verses("a\nb\n\nc"), vec!["a\nb", "c"]);
        assert_eq!(split_verses("\n\na\n \n\n\nb\n\n"), vec!["a", "b"]);
        assert!(split_verses("").is_empty());
        assert!(split_verses("\n  \n").is_empty());
    }

    #[test]
    fn save_song_enriches_and_reformats_date() {
        let (store, service) = build(details("16.07.2006"));
        let id = service.save_song("Muse", "Supermassive Black Hole").unwrap();
        let saved = store.songs.lock().unwrap()[0].clone();
        assert_eq!(saved.id, id);
        assert_eq!(saved.group, "Muse");
        assert_eq!(saved.song, "Supermassive Black Hole");
        assert_eq!(saved.release_date, "2006-07-16");
        assert_eq!(saved.link, "https://www.youtube.com/watch?v=Xsp3_a-PMTw");
    }

    #[test]
    fn save_song_twice_already_exists() {
        let (_store, service) = build(details("16.07.2006"));
        service.save_song("Muse", "Supermassive Black Hole").unwrap();
        let err = service.save_song("Muse", "Supermassive Black Hole").unwrap_err();
        assert!(matches!(err, SongError::AlreadyExists));
    }

    #[test]
    fn save_song_with_bad_upstream_date_never_stores() {
        let (store, service) = build(details("2006-07-16"));
        let err = service.save_song("Muse", "Supermassive Black Hole").unwrap_err();
        assert!(matches!(err, SongError::InvalidDateFormat));
        assert!(store.songs.lock().unwrap().is_empty());
    }

    #[test]
    fn save_song_propagates_lookup_failures() {
        let (store, service) = build(FakeDetails::Fails(|| DetailsError::BadRequest));
        let err = service.save_song("Muse", "x").unwrap_err();
        assert!(matches!(err, SongError::Details(DetailsError::BadRequest)));
        assert!(store.songs.lock().unwrap().is_empty());

        let (_store, service) = build(FakeDetails::Fails(|| DetailsError::Internal));
        let err = service.save_song("Muse", "x").unwrap_err();
        assert!(matches!(err, SongError::Details(DetailsError::Internal)));
    }

    #[test]
    fn empty_update_is_rejected_for_any_id() {
        let (store, service) = build(details("16.07.2006"));
        for id in [-1, 0, 1, i64::MAX] {
            let err = service.update_song(id, SongPatch::default()).unwrap_err();
            assert!(matches!(err, SongError::EmptyUpdate));
        }
        assert!(store.patches.lock().unwrap().is_empty());
    }

    #[test]
    fn update_normalizes_release_date() {
        let (store, service) = build(details("16.07.2006"));
        let patch = SongPatch {
            release_date: Some("01.12.2003".to_string()),
            link: Some(String::new()),
            ..SongPatch::default()
        };
        service.update_song(4, patch).unwrap();
        let (id, stored) = store.patches.lock().unwrap()[0].clone();
        assert_eq!(id, 4);
        assert_eq!(stored.release_date.as_deref(), Some("2003-12-01"));
        assert_eq!(stored.link.as_deref(), Some(""));
    }

    #[test]
    fn update_with_bad_date_never_reaches_store() {
        let (store, service) = build(details("16.07.2006"));
        let patch = SongPatch {
            release_date: Some("2003-12-01".to_string()),
            ..SongPatch::default()
        };
        let err = service.update_song(4, patch).unwrap_err();
        assert!(matches!(err, SongError::InvalidDateFormat));
        assert!(store.patches.lock().unwrap().is_empty());
    }

    #[test]
    fn blank_filter_fields_match_absent_ones() {
        let (store, service, _id) = store_with_lyrics("a");
        service.songs(blank_filter(Some(""))).unwrap();
        service.songs(blank_filter(Some("   "))).unwrap();
        service.songs(blank_filter(None)).unwrap();
        let filters = store.filters.lock().unwrap();
        assert_eq!(filters.len(), 3);
        for filter in filters.iter() {
            assert_eq!(filter, &blank_filter(None));
        }
    }

    #[test]
    fn filter_release_date_is_normalized_or_rejected() {
        let (store, service, _id) = store_with_lyrics("a");
        let filter = SongFilter {
            release_date: Some("01.12.2003".to_string()),
            ..blank_filter(None)
        };
        service.songs(filter).unwrap();
        assert_eq!(
            store.filters.lock().unwrap()[0].release_date.as_deref(),
            Some("2003-12-01")
        );

        let filter = SongFilter {
            release_date: Some("Dec 2003".to_string()),
            ..blank_filter(None)
        };
        assert!(matches!(service.songs(filter), Err(SongError::InvalidDateFormat)));
        assert_eq!(store.filters.lock().unwrap().len(), 1);
    }

    #[test]
    fn text_returns_requested_verse() {
        let (_store, service, id) = store_with_lyrics("one\ntwo\n\n\nthree\n\nfour\n");
        assert_eq!(service.text(id, 1).unwrap(), "one\ntwo");
        assert_eq!(service.text(id, 2).unwrap(), "three");
        assert_eq!(service.text(id, 3).unwrap(), "four");
    }

    #[test]
    fn text_rejects_out_of_range_verses() {
        let (_store, service, id) = store_with_lyrics("one\n\ntwo");
        for verse in [i64::MIN, -1, 0, 3, i64::MAX] {
            assert!(
                matches!(service.text(id, verse), Err(SongError::InvalidVerseNumber)),
                "verse {verse}"
            );
        }
    }

    #[test]
    fn text_propagates_missing_song() {
        let (_store, service, id) = store_with_lyrics("one");
        assert!(matches!(service.text(id + 1, 1), Err(SongError::NotFound)));
    }
}
