//! SQLite schema for users, profiles, songs and playlists.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, PartialUniqueIndex, SqlType, Table, VersionedSchema,
    DEFAULT_TIMESTAMP,
};

pub const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("email", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_user_handle", "handle")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

pub const PROFILE_TABLE_V_0: Table = Table {
    name: "profile",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("age", &SqlType::Integer),
        sqlite_column!("location", &SqlType::Text),
        sqlite_column!("hobbies", &SqlType::Text),
        sqlite_column!("favorite_genres", &SqlType::Text),
        sqlite_column!("mood_description", &SqlType::Text),
        sqlite_column!("mood_vector", &SqlType::Text), // JSON array of floats
        sqlite_column!(
            "updated",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[&["user_id"]],
    partial_unique_indices: &[],
};

pub const SONG_TABLE_V_0: Table = Table {
    name: "song",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("theme", &SqlType::Text),
    ],
    indices: &[("idx_song_title", "title")],
    unique_constraints: &[],
    partial_unique_indices: &[],
};

pub const PLAYLIST_TABLE_V_0: Table = Table {
    name: "playlist",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "user_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "user",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "is_favorite",
            &SqlType::Integer,
            non_null = true,
            default_value = Some("0")
        ),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_playlist_user_id", "user_id")],
    unique_constraints: &[],
    partial_unique_indices: &[PartialUniqueIndex {
        name: "idx_playlist_single_favorite",
        columns: &["user_id"],
        predicate: "is_favorite = 1",
    }],
};

pub const PLAYLIST_ITEM_TABLE_V_0: Table = Table {
    name: "playlist_item",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "playlist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "playlist",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "song_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ForeignKey {
                foreign_table: "song",
                foreign_column: "id",
                on_delete: ForeignKeyOnChange::Cascade,
            })
        ),
        sqlite_column!(
            "added_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[&["playlist_id", "song_id"]],
    partial_unique_indices: &[],
};

/// Onboarding questions. `options` holds a JSON array of strings.
pub const QUESTION_TABLE_V_1: Table = Table {
    name: "question",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("question_order", &SqlType::Integer, non_null = true),
        sqlite_column!("text", &SqlType::Text, non_null = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("options", &SqlType::Text, non_null = true),
    ],
    indices: &[],
    unique_constraints: &[&["question_order"]],
    partial_unique_indices: &[],
};

pub const MUSIC_VERSIONED_SCHEMAS: &[VersionedSchema] = &[
    VersionedSchema {
        version: 0,
        tables: &[
            USER_TABLE_V_0,
            PROFILE_TABLE_V_0,
            SONG_TABLE_V_0,
            PLAYLIST_TABLE_V_0,
            PLAYLIST_ITEM_TABLE_V_0,
        ],
        migration: None,
    },
    VersionedSchema {
        version: 1,
        tables: &[
            USER_TABLE_V_0,
            PROFILE_TABLE_V_0,
            SONG_TABLE_V_0,
            PLAYLIST_TABLE_V_0,
            PLAYLIST_ITEM_TABLE_V_0,
            QUESTION_TABLE_V_1,
        ],
        migration: Some(|conn: &rusqlite::Connection| QUESTION_TABLE_V_1.create(conn)),
    },
];
