use axum::extract::FromRef;

use crate::matching::SimilarityMatcher;
use crate::music_store::MusicStore;
use crate::playlist::PlaylistCurator;
use std::sync::Arc;
use std::time::Instant;

use super::ServerConfig;

pub type GuardedMusicStore = Arc<dyn MusicStore>;
pub type GuardedMatcher = Arc<SimilarityMatcher>;
pub type GuardedCurator = Arc<PlaylistCurator>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub music_store: GuardedMusicStore,
    pub matcher: GuardedMatcher,
    pub curator: GuardedCurator,
    pub hash: String,
}

impl FromRef<ServerState> for GuardedMusicStore {
    fn from_ref(input: &ServerState) -> Self {
        input.music_store.clone()
    }
}

impl FromRef<ServerState> for GuardedMatcher {
    fn from_ref(input: &ServerState) -> Self {
        input.matcher.clone()
    }
}

impl FromRef<ServerState> for GuardedCurator {
    fn from_ref(input: &ServerState) -> Self {
        input.curator.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
