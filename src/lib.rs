//! Moodmatch server library
//!
//! Mood-vector matching between users and playlist curation, exposed over
//! HTTP. The modules are public so the end-to-end tests can drive them.

pub mod config;
pub mod matching;
pub mod music_store;
pub mod playlist;
pub mod server;
pub mod sqlite_persistence;

pub use matching::SimilarityMatcher;
pub use music_store::{MusicStore, SqliteMusicStore};
pub use playlist::PlaylistCurator;
pub use server::{run_server, RequestsLoggingLevel};
