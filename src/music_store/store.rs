use super::models::*;
use super::schema::*;
use super::trait_def::*;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Clone)]
pub struct SqliteMusicStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMusicStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = open_versioned_db(db_path, MUSIC_VERSIONED_SCHEMAS)
            .with_context(|| format!("Failed to open music db at {:?}", db_path))?;

        // Readers never block the single writer.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        info!("Opened music db at {:?}", db_path);

        Ok(SqliteMusicStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("Music db connection mutex poisoned"))
    }
}

fn datetime_from_column(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_default()
}

const USER_COLUMNS: &str = "id, handle, email, created";
const PROFILE_COLUMNS: &str =
    "user_id, age, location, hobbies, favorite_genres, mood_description, mood_vector";
const SONG_COLUMNS: &str = "id, title, artist, genre, theme";
const PLAYLIST_COLUMNS: &str = "id, user_id, name, is_favorite, created";
const PLAYLIST_ITEM_COLUMNS: &str = "id, playlist_id, song_id, added_at";
const QUESTION_COLUMNS: &str = "id, question_order, text, kind, options";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        handle: row.get(1)?,
        email: row.get(2)?,
        created: datetime_from_column(row.get(3)?),
    })
}

fn profile_from_row(row: &Row) -> rusqlite::Result<Profile> {
    Ok(Profile {
        user_id: row.get(0)?,
        age: row.get(1)?,
        location: row.get(2)?,
        hobbies: row.get(3)?,
        favorite_genres: row.get(4)?,
        mood_description: row.get(5)?,
        mood_vector: row.get(6)?,
    })
}

fn song_from_row(row: &Row) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        genre: row.get(3)?,
        theme: row.get(4)?,
    })
}

fn playlist_from_row(row: &Row) -> rusqlite::Result<Playlist> {
    Ok(Playlist {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        is_favorite: row.get::<_, i64>(3)? != 0,
        created: datetime_from_column(row.get(4)?),
    })
}

fn playlist_item_from_row(row: &Row) -> rusqlite::Result<PlaylistItem> {
    Ok(PlaylistItem {
        id: row.get(0)?,
        playlist_id: row.get(1)?,
        song_id: row.get(2)?,
        added_at: datetime_from_column(row.get(3)?),
    })
}

fn question_from_row(row: &Row) -> rusqlite::Result<Question> {
    let raw_options: String = row.get(4)?;
    let options = serde_json::from_str(&raw_options).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(Question {
        id: row.get(0)?,
        question_order: row.get(1)?,
        text: row.get(2)?,
        kind: row.get(3)?,
        options,
    })
}

fn row_exists(conn: &Connection, table: &str, id: usize) -> Result<bool> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {} WHERE id = ?1", table),
            params![id],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn select_user(conn: &Connection, user_id: UserId) -> Result<Option<User>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                USER_COLUMNS, USER_TABLE_V_0.name
            ),
            params![user_id],
            user_from_row,
        )
        .optional()?)
}

fn select_profile(conn: &Connection, user_id: UserId) -> Result<Option<Profile>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE user_id = ?1",
                PROFILE_COLUMNS, PROFILE_TABLE_V_0.name
            ),
            params![user_id],
            profile_from_row,
        )
        .optional()?)
}

fn select_playlist(conn: &Connection, playlist_id: PlaylistId) -> Result<Option<Playlist>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE id = ?1",
                PLAYLIST_COLUMNS, PLAYLIST_TABLE_V_0.name
            ),
            params![playlist_id],
            playlist_from_row,
        )
        .optional()?)
}

fn select_item(
    conn: &Connection,
    playlist_id: PlaylistId,
    song_id: SongId,
) -> Result<Option<PlaylistItem>> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {} FROM {} WHERE playlist_id = ?1 AND song_id = ?2",
                PLAYLIST_ITEM_COLUMNS, PLAYLIST_ITEM_TABLE_V_0.name
            ),
            params![playlist_id, song_id],
            playlist_item_from_row,
        )
        .optional()?)
}

/// Inserts the favorites playlist unless the user already has one, then reads
/// back whichever row won. The partial unique index turns a second insert
/// into a no-op.
fn upsert_favorites(conn: &Connection, user_id: UserId, name: &str) -> Result<Playlist> {
    let inserted = conn.execute(
        &format!(
            "INSERT INTO {} (user_id, name, is_favorite) VALUES (?1, ?2, 1) ON CONFLICT DO NOTHING",
            PLAYLIST_TABLE_V_0.name
        ),
        params![user_id, name],
    )?;
    if inserted > 0 {
        debug!("Created favorites playlist for user {}", user_id);
    }
    conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE user_id = ?1 AND is_favorite = 1",
            PLAYLIST_COLUMNS, PLAYLIST_TABLE_V_0.name
        ),
        params![user_id],
        playlist_from_row,
    )
    .with_context(|| format!("Favorites playlist of user {} vanished", user_id))
}

impl UserStore for SqliteMusicStore {
    fn create_user(&self, handle: &str, email: &str) -> Result<User> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            &format!(
                "INSERT INTO {} (handle, email) VALUES (?1, ?2)",
                USER_TABLE_V_0.name
            ),
            params![handle, email],
        )
        .with_context(|| format!("Failed to create user {}", handle))?;
        let user_id = tx.last_insert_rowid() as UserId;
        upsert_favorites(&tx, user_id, FAVORITES_PLAYLIST_NAME)?;
        let user = select_user(&tx, user_id)?.context("Created user not readable")?;

        tx.commit()?;
        Ok(user)
    }

    fn get_user(&self, user_id: UserId) -> Result<Option<User>> {
        let conn = self.lock()?;
        select_user(&conn, user_id)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE email = ?1",
                    USER_COLUMNS, USER_TABLE_V_0.name
                ),
                params![email],
                user_from_row,
            )
            .optional()?)
    }

    fn get_user_by_handle(&self, handle: &str) -> Result<Option<User>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE handle = ?1",
                    USER_COLUMNS, USER_TABLE_V_0.name
                ),
                params![handle],
                user_from_row,
            )
            .optional()?)
    }
}

impl ProfileStore for SqliteMusicStore {
    fn upsert_profile(
        &self,
        user_id: UserId,
        answers: &ProfileAnswers,
    ) -> Result<Option<Profile>> {
        let mood_vector = answers
            .mood_vector
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to encode mood vector")?;

        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !row_exists(&tx, USER_TABLE_V_0.name, user_id)? {
            return Ok(None);
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (user_id, age, location, hobbies, favorite_genres, mood_description, mood_vector) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT(user_id) DO UPDATE SET \
                 age = excluded.age, location = excluded.location, hobbies = excluded.hobbies, \
                 favorite_genres = excluded.favorite_genres, mood_description = excluded.mood_description, \
                 mood_vector = excluded.mood_vector, updated = cast(strftime('%s','now') as int)",
                PROFILE_TABLE_V_0.name
            ),
            params![
                user_id,
                answers.age,
                answers.location,
                answers.hobbies,
                answers.favorite_genres,
                answers.mood_description,
                mood_vector,
            ],
        )
        .with_context(|| format!("Failed to store profile of user {}", user_id))?;
        let profile = select_profile(&tx, user_id)?;

        tx.commit()?;
        Ok(profile)
    }

    fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        let conn = self.lock()?;
        select_profile(&conn, user_id)
    }

    fn get_candidate_vectors(&self, excluded_user_id: UserId) -> Result<Vec<ProfileVector>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT p.user_id, u.handle, p.mood_vector FROM {} p JOIN {} u ON u.id = p.user_id \
             WHERE p.user_id != ?1 AND p.mood_vector IS NOT NULL ORDER BY p.id",
            PROFILE_TABLE_V_0.name, USER_TABLE_V_0.name
        ))?;
        let rows = stmt.query_map(params![excluded_user_id], |row| {
            Ok(ProfileVector {
                user_id: row.get(0)?,
                display_name: row.get(1)?,
                raw_vector: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl SongStore for SqliteMusicStore {
    fn create_song(&self, song: &NewSong) -> Result<Song> {
        let conn = self.lock()?;
        conn.execute(
            &format!(
                "INSERT INTO {} (title, artist, genre, theme) VALUES (?1, ?2, ?3, ?4)",
                SONG_TABLE_V_0.name
            ),
            params![song.title, song.artist, song.genre, song.theme],
        )
        .with_context(|| format!("Failed to create song {}", song.title))?;

        Ok(Song {
            id: conn.last_insert_rowid() as SongId,
            title: song.title.clone(),
            artist: song.artist.clone(),
            genre: song.genre.clone(),
            theme: song.theme.clone(),
        })
    }

    fn get_song(&self, song_id: SongId) -> Result<Option<Song>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    SONG_COLUMNS, SONG_TABLE_V_0.name
                ),
                params![song_id],
                song_from_row,
            )
            .optional()?)
    }
}

impl PlaylistStore for SqliteMusicStore {
    fn insert_playlist_below_limit(
        &self,
        user_id: UserId,
        name: &str,
        limit: usize,
    ) -> Result<PlaylistInsert> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !row_exists(&tx, USER_TABLE_V_0.name, user_id)? {
            return Ok(PlaylistInsert::UserNotFound);
        }
        let owned: usize = tx.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE user_id = ?1 AND is_favorite = 0",
                PLAYLIST_TABLE_V_0.name
            ),
            params![user_id],
            |row| row.get(0),
        )?;
        if owned >= limit {
            return Ok(PlaylistInsert::LimitReached);
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (user_id, name, is_favorite) VALUES (?1, ?2, 0)",
                PLAYLIST_TABLE_V_0.name
            ),
            params![user_id, name],
        )
        .context("Could not create playlist")?;
        let playlist_id = tx.last_insert_rowid() as PlaylistId;
        let playlist = select_playlist(&tx, playlist_id)?.context("Created playlist not readable")?;

        tx.commit()?;
        Ok(PlaylistInsert::Created(playlist))
    }

    fn get_or_create_favorites(&self, user_id: UserId, name: &str) -> Result<Option<Playlist>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !row_exists(&tx, USER_TABLE_V_0.name, user_id)? {
            return Ok(None);
        }
        let favorites = upsert_favorites(&tx, user_id, name)?;

        tx.commit()?;
        Ok(Some(favorites))
    }

    fn get_user_playlists(&self, user_id: UserId) -> Result<Vec<Playlist>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE user_id = ?1 ORDER BY id",
            PLAYLIST_COLUMNS, PLAYLIST_TABLE_V_0.name
        ))?;
        let rows = stmt.query_map(params![user_id], playlist_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn get_playlist(&self, playlist_id: PlaylistId) -> Result<Option<Playlist>> {
        let conn = self.lock()?;
        select_playlist(&conn, playlist_id)
    }

    fn insert_item_if_absent(
        &self,
        playlist_id: PlaylistId,
        song_id: SongId,
        limit: usize,
    ) -> Result<ItemInsert> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !row_exists(&tx, PLAYLIST_TABLE_V_0.name, playlist_id)? {
            return Ok(ItemInsert::PlaylistNotFound);
        }
        // A full playlist still answers duplicate adds with the existing item.
        if let Some(existing) = select_item(&tx, playlist_id, song_id)? {
            return Ok(ItemInsert::AlreadyPresent(existing));
        }
        if !row_exists(&tx, SONG_TABLE_V_0.name, song_id)? {
            return Ok(ItemInsert::SongNotFound);
        }
        let count: usize = tx.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE playlist_id = ?1",
                PLAYLIST_ITEM_TABLE_V_0.name
            ),
            params![playlist_id],
            |row| row.get(0),
        )?;
        if count >= limit {
            return Ok(ItemInsert::LimitReached);
        }

        tx.execute(
            &format!(
                "INSERT INTO {} (playlist_id, song_id) VALUES (?1, ?2)",
                PLAYLIST_ITEM_TABLE_V_0.name
            ),
            params![playlist_id, song_id],
        )
        .with_context(|| format!("Could not add song {} to playlist {}", song_id, playlist_id))?;
        let item = select_item(&tx, playlist_id, song_id)?.context("Added item not readable")?;

        tx.commit()?;
        Ok(ItemInsert::Added(item))
    }

    fn delete_item(&self, playlist_id: PlaylistId, song_id: SongId) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE playlist_id = ?1 AND song_id = ?2",
                PLAYLIST_ITEM_TABLE_V_0.name
            ),
            params![playlist_id, song_id],
        )?;
        Ok(deleted > 0)
    }

    fn get_playlist_items(&self, playlist_id: PlaylistId) -> Result<Vec<PlaylistItem>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} WHERE playlist_id = ?1 ORDER BY added_at, id",
            PLAYLIST_ITEM_COLUMNS, PLAYLIST_ITEM_TABLE_V_0.name
        ))?;
        let rows = stmt.query_map(params![playlist_id], playlist_item_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

impl QuestionStore for SqliteMusicStore {
    fn seed_questions_if_empty(&self, questions: &[NewQuestion]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: usize = tx.query_row(
            &format!("SELECT COUNT(*) FROM {}", QUESTION_TABLE_V_1.name),
            [],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(0);
        }

        for question in questions {
            let options =
                serde_json::to_string(&question.options).context("Failed to encode options")?;
            tx.execute(
                &format!(
                    "INSERT INTO {} (question_order, text, kind, options) VALUES (?1, ?2, ?3, ?4)",
                    QUESTION_TABLE_V_1.name
                ),
                params![question.question_order, question.text, question.kind, options],
            )
            .with_context(|| format!("Failed to seed question {}", question.question_order))?;
        }

        tx.commit()?;
        Ok(questions.len())
    }

    fn get_questions(&self) -> Result<Vec<Question>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY question_order, id",
            QUESTION_COLUMNS, QUESTION_TABLE_V_1.name
        ))?;
        let rows = stmt.query_map([], question_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}
