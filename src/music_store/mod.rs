mod models;
mod questions;
mod schema;
mod store;
mod trait_def;

pub use models::*;
pub use questions::default_questions;
pub use schema::MUSIC_VERSIONED_SCHEMAS;
pub use store::SqliteMusicStore;
pub use trait_def::{
    MusicStore, PlaylistStore, ProfileStore, QuestionStore, SongStore, UserStore,
};
