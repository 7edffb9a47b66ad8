//! SQLite song store.
//!
//! Provides pooled connections, schema bootstrap and the song queries. Every
//! operation is a single statement; uniqueness of (group, song) is enforced
//! by the table constraint.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};

use crate::error::SongError;
use crate::models::{NewSong, Song, SongFilter, SongPatch};
use crate::song_service::SongRepository;

const SCHEMA_VERSION: i32 = 1;
const SONG_COLUMNS: &str = r#"id, "group", song, release_date, lyrics, link"#;
const POOL_SIZE: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct SongDb {
    pool: Pool<SqliteConnectionManager>,
    schema_version: i32,
}

/// SQL text plus its positional parameters, in binding order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SqlStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlStatement {
    fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter and return its placeholder.
    fn bind(&mut self, value: impl Into<Value>) -> String {
        self.params.push(value.into());
        format!("?{}", self.params.len())
    }
}

/// Build the filtered, paginated listing query.
///
/// Predicates are emitted in the order group, song, release date.
pub(crate) fn filter_statement(filter: &SongFilter) -> SqlStatement {
    let mut stmt = SqlStatement::new(format!("SELECT {SONG_COLUMNS} FROM songs"));
    let mut predicates = Vec::new();
    if let Some(group) = filter.group.as_ref() {
        let placeholder = stmt.bind(group.clone());
        predicates.push(format!(r#""group" = {placeholder}"#));
    }
    if let Some(song) = filter.song.as_ref() {
        let placeholder = stmt.bind(song.clone());
        predicates.push(format!("song = {placeholder}"));
    }
    if let Some(release_date) = filter.release_date.as_ref() {
        let placeholder = stmt.bind(release_date.clone());
        predicates.push(format!("release_date = {placeholder}"));
    }
    if !predicates.is_empty() {
        stmt.sql.push_str(" WHERE ");
        stmt.sql.push_str(&predicates.join(" AND "));
    }
    let limit = stmt.bind(i64::from(filter.per_page));
    let offset = stmt.bind(filter.offset());
    stmt.sql
        .push_str(&format!(" ORDER BY id DESC LIMIT {limit} OFFSET {offset}"));
    stmt
}

/// Build the partial update for the present patch fields, or `None` if the
/// patch sets nothing.
pub(crate) fn patch_statement(id: i64, patch: &SongPatch) -> Option<SqlStatement> {
    let mut stmt = SqlStatement::new("UPDATE songs SET ");
    let mut assignments = Vec::new();
    let columns = [
        (r#""group""#, patch.group.as_ref()),
        ("song", patch.song.as_ref()),
        ("link", patch.link.as_ref()),
        ("release_date", patch.release_date.as_ref()),
        ("lyrics", patch.text.as_ref()),
    ];
    for (column, value) in columns {
        if let Some(value) = value {
            let placeholder = stmt.bind(value.clone());
            assignments.push(format!("{column} = {placeholder}"));
        }
    }
    if assignments.is_empty() {
        return None;
    }
    stmt.sql.push_str(&assignments.join(", "));
    let id_placeholder = stmt.bind(id);
    stmt.sql.push_str(&format!(" WHERE id = {id_placeholder}"));
    Some(stmt)
}

fn map_song_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        group: row.get(1)?,
        song: row.get(2)?,
        release_date: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        text: row.get(4)?,
        link: row.get(5)?,
    })
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(code, _)
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Classify a driver error: uniqueness conflicts become `AlreadyExists`,
/// everything else is wrapped with the operation name.
fn store_error(err: rusqlite::Error, op: &'static str) -> SongError {
    if is_unique_violation(&err) {
        SongError::AlreadyExists
    } else {
        SongError::Other(anyhow::Error::new(err).context(op))
    }
}

impl SongDb {
    pub fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create song db dir {:?}", parent))?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(POOL_SIZE)
            .build(manager)
            .context("create song db pool")?;

        let schema_version = {
            let conn = pool.get().context("open song db")?;
            init_schema(&conn)?
        };

        Ok(Self {
            pool,
            schema_version,
        })
    }

    pub fn schema_version(&self) -> i32 {
        self.schema_version
    }
}

impl SongRepository for SongDb {
    fn save_song(&self, song: &NewSong) -> Result<i64, SongError> {
        let conn = self.pool.get().context("open song db")?;
        let release_date = Some(song.release_date.as_str()).filter(|date| !date.is_empty());
        conn.execute(
            r#"
            INSERT INTO songs ("group", song, release_date, lyrics, link)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![song.group, song.song, release_date, song.text, song.link],
        )
        .map_err(|err| store_error(err, "insert song"))?;
        Ok(conn.last_insert_rowid())
    }

    fn songs(&self, filter: &SongFilter) -> Result<Vec<Song>, SongError> {
        let conn = self.pool.get().context("open song db")?;
        let stmt = filter_statement(filter);
        let mut query = conn.prepare(&stmt.sql).context("prepare song listing")?;
        let songs = query
            .query_map(params_from_iter(stmt.params.iter()), map_song_row)
            .context("list songs")?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("read song rows")?;
        if songs.is_empty() {
            return Err(SongError::NotFound);
        }
        Ok(songs)
    }

    fn text(&self, id: i64) -> Result<String, SongError> {
        let conn = self.pool.get().context("open song db")?;
        conn.query_row(
            "SELECT lyrics FROM songs WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()
        .context("lookup song lyrics")?
        .ok_or(SongError::NotFound)
    }

    fn update_song(&self, id: i64, patch: &SongPatch) -> Result<(), SongError> {
        let stmt = patch_statement(id, patch).ok_or(SongError::EmptyUpdate)?;
        let conn = self.pool.get().context("open song db")?;
        let updated = conn
            .execute(&stmt.sql, params_from_iter(stmt.params.iter()))
            .map_err(|err| store_error(err, "update song"))?;
        if updated == 0 {
            return Err(SongError::NotFound);
        }
        Ok(())
    }

    fn delete_song(&self, id: i64) -> Result<(), SongError> {
        let conn = self.pool.get().context("open song db")?;
        let deleted = conn
            .execute("DELETE FROM songs WHERE id = ?1", params![id])
            .context("delete song")?;
        if deleted == 0 {
            return Err(SongError::NotFound);
        }
        Ok(())
    }

    fn ping(&self) -> Result<(), SongError> {
        let conn = self.pool.get().context("open song db")?;
        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .context("ping song db")?;
        Ok(())
    }
}

fn init_schema(conn: &Connection) -> Result<i32> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            "group" TEXT NOT NULL,
            song TEXT NOT NULL,
            release_date TEXT,
            lyrics TEXT NOT NULL DEFAULT '',
            link TEXT NOT NULL DEFAULT '',
            UNIQUE ("group", song)
        );

        CREATE INDEX IF NOT EXISTS idx_songs_release_date ON songs(release_date);
        "#,
    )
    .context("create songs schema")?;

    let version_raw: Option<String> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()
        .context("read schema version")?;
    if let Some(version) = version_raw.as_deref().and_then(|v| v.parse::<i32>().ok()) {
        return Ok(version);
    }
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION.to_string()],
    )
    .context("insert schema version")?;
    Ok(SCHEMA_VERSION)
}
