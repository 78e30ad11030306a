//! Ownership and capacity rules over playlists and the per-user favorites
//! playlist.
//!
//! Every check-then-write goes through a single store call that runs it
//! atomically, so the curator itself keeps no state and takes no locks.

use super::CuratorError;
use crate::music_store::*;
use crate::server::metrics;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

pub const MAX_PLAYLISTS_PER_USER: usize = 40;
pub const MAX_PLAYLIST_ITEMS: usize = 500;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

fn rejected(err: CuratorError) -> CuratorError {
    debug!("Playlist operation rejected: {}", err);
    metrics::record_curator_rejection(err.kind());
    err
}

pub struct PlaylistCurator {
    store: Arc<dyn PlaylistStore>,
}

impl PlaylistCurator {
    pub fn new(store: Arc<dyn PlaylistStore>) -> Self {
        PlaylistCurator { store }
    }

    /// Creates a playlist for `user_id`. A favorite request resolves to the
    /// user's single favorites playlist, creating it only if missing.
    pub fn create_playlist(
        &self,
        user_id: UserId,
        name: &str,
        is_favorite: bool,
    ) -> Result<Playlist, CuratorError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(rejected(CuratorError::InvalidInput(
                "Playlist name cannot be empty".to_string(),
            )));
        }
        if is_favorite {
            return self.favorites_named(user_id, name);
        }

        match self
            .store
            .insert_playlist_below_limit(user_id, name, MAX_PLAYLISTS_PER_USER)?
        {
            PlaylistInsert::Created(playlist) => {
                info!("User {} created playlist {}", user_id, playlist.id);
                Ok(playlist)
            }
            PlaylistInsert::UserNotFound => Err(rejected(CuratorError::NotFound(format!(
                "User {} not found",
                user_id
            )))),
            PlaylistInsert::LimitReached => Err(rejected(CuratorError::LimitExceeded(format!(
                "Cannot create more than {} playlists",
                MAX_PLAYLISTS_PER_USER
            )))),
        }
    }

    pub fn list_playlists(&self, user_id: UserId) -> Result<Vec<Playlist>, CuratorError> {
        Ok(self.store.get_user_playlists(user_id)?)
    }

    /// Returns the user's favorites playlist, creating it on first access.
    pub fn get_favorites(&self, user_id: UserId) -> Result<Playlist, CuratorError> {
        self.favorites_named(user_id, FAVORITES_PLAYLIST_NAME)
    }

    fn favorites_named(&self, user_id: UserId, name: &str) -> Result<Playlist, CuratorError> {
        self.store
            .get_or_create_favorites(user_id, name)?
            .ok_or_else(|| rejected(CuratorError::NotFound(format!("User {} not found", user_id))))
    }

    /// Adds a song. Adding a song that is already there returns the existing
    /// item untouched.
    pub fn add_song(
        &self,
        playlist_id: PlaylistId,
        song_id: SongId,
    ) -> Result<PlaylistItem, CuratorError> {
        match self
            .store
            .insert_item_if_absent(playlist_id, song_id, MAX_PLAYLIST_ITEMS)?
        {
            ItemInsert::Added(item) => {
                debug!("Added song {} to playlist {}", song_id, playlist_id);
                Ok(item)
            }
            ItemInsert::AlreadyPresent(item) => Ok(item),
            ItemInsert::PlaylistNotFound => Err(rejected(CuratorError::NotFound(format!(
                "Playlist {} not found",
                playlist_id
            )))),
            ItemInsert::SongNotFound => Err(rejected(CuratorError::NotFound(format!(
                "Song {} not found",
                song_id
            )))),
            ItemInsert::LimitReached => Err(rejected(CuratorError::LimitExceeded(format!(
                "Playlist cannot hold more than {} songs",
                MAX_PLAYLIST_ITEMS
            )))),
        }
    }

    pub fn remove_song(&self, playlist_id: PlaylistId, song_id: SongId) -> Result<(), CuratorError> {
        if self.take_out(playlist_id, song_id)? {
            Ok(())
        } else {
            Err(rejected(CuratorError::NotFound(format!(
                "Song {} is not in playlist {}",
                song_id, playlist_id
            ))))
        }
    }

    /// Deletes the item if present. An absent item is not a rejection here.
    fn take_out(&self, playlist_id: PlaylistId, song_id: SongId) -> Result<bool, CuratorError> {
        let removed = self.store.delete_item(playlist_id, song_id)?;
        if removed {
            debug!("Removed song {} from playlist {}", song_id, playlist_id);
        }
        Ok(removed)
    }

    /// Removes the song from the user's favorites if present, adds it otherwise.
    pub fn toggle_favorite(
        &self,
        user_id: UserId,
        song_id: SongId,
    ) -> Result<ToggleOutcome, CuratorError> {
        let favorites = self.get_favorites(user_id)?;
        if self.take_out(favorites.id, song_id)? {
            return Ok(ToggleOutcome::Removed);
        }
        self.add_song(favorites.id, song_id)?;
        Ok(ToggleOutcome::Added)
    }

    pub fn list_playlist_items(
        &self,
        playlist_id: PlaylistId,
    ) -> Result<Vec<PlaylistItem>, CuratorError> {
        if self.store.get_playlist(playlist_id)?.is_none() {
            return Err(rejected(CuratorError::NotFound(format!(
                "Playlist {} not found",
                playlist_id
            ))));
        }
        Ok(self.store.get_playlist_items(playlist_id)?)
    }
}
