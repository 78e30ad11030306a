//! Records exchanged between the store and the core components.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = usize;
pub type SongId = usize;
pub type PlaylistId = usize;

/// Name given to a favorites playlist when it is created implicitly.
pub const FAVORITES_PLAYLIST_NAME: &str = "Favorites";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub handle: String,
    pub email: String,
    pub created: DateTime<Utc>,
}

/// Onboarding answers as submitted by the external profile collaborator.
/// `mood_vector` is produced by the (external) embedder and stored verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProfileAnswers {
    pub age: Option<u32>,
    pub location: Option<String>,
    pub hobbies: Option<String>,
    pub favorite_genres: Option<String>,
    pub mood_description: Option<String>,
    pub mood_vector: Option<Vec<f64>>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Profile {
    pub user_id: UserId,
    pub age: Option<u32>,
    pub location: Option<String>,
    pub hobbies: Option<String>,
    pub favorite_genres: Option<String>,
    pub mood_description: Option<String>,
    /// JSON-encoded array of floats, kept as stored. May be absent or malformed.
    pub mood_vector: Option<String>,
}

/// The slice of a profile the matcher needs: whose vector it is, the owner's
/// display name and the raw stored vector payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileVector {
    pub user_id: UserId,
    pub display_name: String,
    pub raw_vector: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NewSong {
    pub title: String,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub theme: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub theme: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: PlaylistId,
    pub user_id: UserId,
    pub name: String,
    pub is_favorite: bool,
    pub created: DateTime<Utc>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    pub id: usize,
    pub playlist_id: PlaylistId,
    pub song_id: SongId,
    pub added_at: DateTime<Utc>,
}

/// An onboarding question as shown to a new user.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Question {
    pub id: usize,
    pub question_order: u32,
    pub text: String,
    /// `select` or `multi-select`.
    #[serde(rename = "type")]
    pub kind: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_order: u32,
    pub text: String,
    pub kind: String,
    pub options: Vec<String>,
}

/// Outcome of a capacity-checked playlist insert.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaylistInsert {
    Created(Playlist),
    UserNotFound,
    LimitReached,
}

/// Outcome of a capacity-checked, duplicate-suppressing item insert.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemInsert {
    Added(PlaylistItem),
    AlreadyPresent(PlaylistItem),
    PlaylistNotFound,
    SongNotFound,
    LimitReached,
}
