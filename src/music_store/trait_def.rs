//! Data-access contracts consumed by the matcher and the curator.
//!
//! Every method that checks a condition before writing (capacity, existence,
//! uniqueness) performs check and write as one atomic unit on the store side,
//! so callers never need to hold a lock of their own.

use super::models::*;
use anyhow::Result;

pub trait UserStore: Send + Sync {
    /// Creates a user together with their favorites playlist.
    /// Returns Err if the handle or email is already taken.
    fn create_user(&self, handle: &str, email: &str) -> Result<User>;

    /// Returns Ok(None) if the user does not exist.
    fn get_user(&self, user_id: UserId) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has that email.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Returns Ok(None) if no user has that handle.
    fn get_user_by_handle(&self, handle: &str) -> Result<Option<User>>;
}

pub trait ProfileStore: Send + Sync {
    /// Inserts or replaces the user's profile.
    /// Returns Ok(None) if the user does not exist.
    fn upsert_profile(&self, user_id: UserId, answers: &ProfileAnswers)
        -> Result<Option<Profile>>;

    /// Returns Ok(None) if the user has no profile.
    fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>>;

    /// Returns the vectors of every profile except `excluded_user_id`'s that
    /// carries a vector payload, in profile insertion order.
    fn get_candidate_vectors(&self, excluded_user_id: UserId) -> Result<Vec<ProfileVector>>;
}

pub trait SongStore: Send + Sync {
    fn create_song(&self, song: &NewSong) -> Result<Song>;

    /// Returns Ok(None) if the song does not exist.
    fn get_song(&self, song_id: SongId) -> Result<Option<Song>>;
}

pub trait PlaylistStore: Send + Sync {
    /// Inserts a non-favorite playlist unless the user already owns `limit`
    /// of them.
    fn insert_playlist_below_limit(
        &self,
        user_id: UserId,
        name: &str,
        limit: usize,
    ) -> Result<PlaylistInsert>;

    /// Returns the user's favorites playlist, inserting it with `name` if it
    /// does not exist yet. Never creates a second one.
    /// Returns Ok(None) if the user does not exist.
    fn get_or_create_favorites(&self, user_id: UserId, name: &str) -> Result<Option<Playlist>>;

    fn get_user_playlists(&self, user_id: UserId) -> Result<Vec<Playlist>>;

    /// Returns Ok(None) if the playlist does not exist.
    fn get_playlist(&self, playlist_id: PlaylistId) -> Result<Option<Playlist>>;

    /// Adds the song unless the pair is already present (returned as-is) or
    /// the playlist already holds `limit` items.
    fn insert_item_if_absent(
        &self,
        playlist_id: PlaylistId,
        song_id: SongId,
        limit: usize,
    ) -> Result<ItemInsert>;

    /// Deletes the (playlist, song) item. Returns false if there was none.
    fn delete_item(&self, playlist_id: PlaylistId, song_id: SongId) -> Result<bool>;

    /// Returns the playlist's items ordered by insertion time.
    fn get_playlist_items(&self, playlist_id: PlaylistId) -> Result<Vec<PlaylistItem>>;
}

pub trait QuestionStore: Send + Sync {
    /// Inserts `questions` only if no question exists yet, as one atomic
    /// unit. Returns how many were inserted.
    fn seed_questions_if_empty(&self, questions: &[NewQuestion]) -> Result<usize>;

    /// Returns every question ordered by `question_order`.
    fn get_questions(&self) -> Result<Vec<Question>>;
}

/// Combined trait for everything the server needs from storage.
pub trait MusicStore: UserStore + ProfileStore + SongStore + PlaylistStore + QuestionStore {}

impl<T: UserStore + ProfileStore + SongStore + PlaylistStore + QuestionStore> MusicStore for T {}
