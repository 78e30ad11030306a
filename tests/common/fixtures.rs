//! Seed data for end-to-end tests

use super::constants::*;
use anyhow::Result;
use moodmatch_server::music_store::{
    default_questions, NewSong, ProfileAnswers, ProfileStore, QuestionStore, SongStore,
    SqliteMusicStore, UserStore,
};
use std::path::PathBuf;
use tempfile::TempDir;

fn profile(vector: &[f64]) -> ProfileAnswers {
    ProfileAnswers {
        mood_description: Some("calm evenings".to_string()),
        mood_vector: Some(vector.to_vec()),
        ..Default::default()
    }
}

/// Creates a database with the users and songs listed in `constants.rs`.
pub fn create_test_db() -> Result<(TempDir, PathBuf)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("moodmatch.db");

    {
        let store = SqliteMusicStore::new(&db_path)?;
        store.seed_questions_if_empty(&default_questions())?;
        for handle in [ALICE_HANDLE, BOB_HANDLE, CAROL_HANDLE, DAVE_HANDLE, ERIN_HANDLE] {
            store.create_user(handle, &format!("{}@example.com", handle))?;
        }

        store.upsert_profile(ALICE_ID, &profile(&ALICE_VECTOR))?;
        store.upsert_profile(BOB_ID, &profile(&BOB_VECTOR))?;
        store.upsert_profile(CAROL_ID, &profile(&CAROL_VECTOR))?;
        store.upsert_profile(DAVE_ID, &profile(&[1.0]))?;

        for title in [SONG_1_TITLE, SONG_2_TITLE, SONG_3_TITLE] {
            store.create_song(&NewSong {
                title: title.to_string(),
                artist: Some("The Test Band".to_string()),
                genre: Some("jazz".to_string()),
                theme: None,
            })?;
        }
    }

    // Payloads the store never writes itself, as left behind by older importers.
    let conn = rusqlite::Connection::open(&db_path)?;
    conn.execute(
        "UPDATE profile SET mood_vector = ?1 WHERE user_id = ?2",
        rusqlite::params![DAVE_RAW_VECTOR, DAVE_ID],
    )?;

    Ok((temp_dir, db_path))
}
