mod curator;
mod error;

pub use curator::{PlaylistCurator, ToggleOutcome, MAX_PLAYLISTS_PER_USER, MAX_PLAYLIST_ITEMS};
pub use error::CuratorError;
