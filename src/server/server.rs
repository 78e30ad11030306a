use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration, time::Instant};

use tracing::{error, info};

use crate::matching::{SimilarityMatcher, UserMatch};
use crate::music_store::{
    MusicStore, NewSong, PlaylistId, ProfileAnswers, ProfileStore, QuestionStore, SongId,
    SongStore, UserId, UserStore,
};
use crate::playlist::{CuratorError, PlaylistCurator, ToggleOutcome};
use tower_http::services::ServeDir;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{log_requests, metrics::metrics_handler, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct CreateUserBody {
    pub handle: String,
    pub email: String,
}

#[derive(Deserialize, Debug)]
struct CreatePlaylistBody {
    pub name: String,
    #[serde(default)]
    pub is_favorite: bool,
}

#[derive(Deserialize, Debug)]
struct MatchesQuery {
    pub top_k: Option<usize>,
}

#[derive(Serialize)]
struct MatchesResponse {
    user_id: UserId,
    recommended_users: Vec<UserMatch>,
}

#[derive(Serialize)]
struct ToggleResponse {
    status: ToggleOutcome,
    message: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn internal_error(err: anyhow::Error) -> Response {
    error!("Request failed: {:#}", err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

async fn create_user(
    State(store): State<GuardedMusicStore>,
    Json(body): Json<CreateUserBody>,
) -> Response {
    let handle = body.handle.trim();
    let email = body.email.trim();
    if handle.is_empty() || email.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Handle and email are required");
    }

    let taken = |store: &GuardedMusicStore| -> Result<bool> {
        Ok(store.get_user_by_handle(handle)?.is_some()
            || store.get_user_by_email(email)?.is_some())
    };
    match taken(&store) {
        Ok(true) => return error_response(StatusCode::CONFLICT, "Handle or email already taken"),
        Ok(false) => {}
        Err(err) => return internal_error(err),
    }

    match store.create_user(handle, email) {
        Ok(user) => {
            info!("Created user {} ({})", user.id, user.handle);
            (StatusCode::CREATED, Json(user)).into_response()
        }
        // Lost a race against a concurrent signup with the same handle or email.
        Err(err) if matches!(taken(&store), Ok(true)) => {
            info!("User creation conflict: {:#}", err);
            error_response(StatusCode::CONFLICT, "Handle or email already taken")
        }
        Err(err) => internal_error(err),
    }
}

async fn get_user(State(store): State<GuardedMusicStore>, Path(user_id): Path<UserId>) -> Response {
    match store.get_user(user_id) {
        Ok(Some(user)) => Json(user).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("User {} not found", user_id)),
        Err(err) => internal_error(err),
    }
}

async fn put_profile(
    State(store): State<GuardedMusicStore>,
    Path(user_id): Path<UserId>,
    Json(answers): Json<ProfileAnswers>,
) -> Response {
    match store.upsert_profile(user_id, &answers) {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("User {} not found", user_id)),
        Err(err) => internal_error(err),
    }
}

async fn get_matches(
    State(state): State<ServerState>,
    Path(user_id): Path<UserId>,
    Query(query): Query<MatchesQuery>,
) -> Response {
    match state.music_store.get_user(user_id) {
        Ok(Some(_)) => {}
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("User {} not found", user_id))
        }
        Err(err) => return internal_error(err),
    }

    let top_k = query
        .top_k
        .unwrap_or(state.config.default_top_k)
        .min(state.config.max_top_k);
    // SQLite reads and the rayon pass block, keep them off the async workers.
    let matcher = state.matcher.clone();
    match tokio::task::spawn_blocking(move || matcher.rank(user_id, top_k)).await {
        Ok(Ok(recommended_users)) => Json(MatchesResponse {
            user_id,
            recommended_users,
        })
        .into_response(),
        Ok(Err(err)) => internal_error(err),
        Err(err) => internal_error(err.into()),
    }
}

async fn create_song(
    State(store): State<GuardedMusicStore>,
    Json(song): Json<NewSong>,
) -> Response {
    if song.title.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Song title is required");
    }
    match store.create_song(&song) {
        Ok(song) => (StatusCode::CREATED, Json(song)).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn get_song(State(store): State<GuardedMusicStore>, Path(song_id): Path<SongId>) -> Response {
    match store.get_song(song_id) {
        Ok(Some(song)) => Json(song).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("Song {} not found", song_id)),
        Err(err) => internal_error(err),
    }
}

async fn get_questions(State(store): State<GuardedMusicStore>) -> Response {
    match store.get_questions() {
        Ok(questions) => Json(questions).into_response(),
        Err(err) => internal_error(err),
    }
}

async fn create_playlist(
    State(curator): State<GuardedCurator>,
    Path(user_id): Path<UserId>,
    Json(body): Json<CreatePlaylistBody>,
) -> Result<impl IntoResponse, CuratorError> {
    let playlist = curator.create_playlist(user_id, &body.name, body.is_favorite)?;
    Ok((StatusCode::CREATED, Json(playlist)))
}

async fn list_playlists(
    State(curator): State<GuardedCurator>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, CuratorError> {
    Ok(Json(curator.list_playlists(user_id)?))
}

async fn get_favorites(
    State(curator): State<GuardedCurator>,
    Path(user_id): Path<UserId>,
) -> Result<impl IntoResponse, CuratorError> {
    Ok(Json(curator.get_favorites(user_id)?))
}

async fn toggle_favorite(
    State(curator): State<GuardedCurator>,
    Path((user_id, song_id)): Path<(UserId, SongId)>,
) -> Result<impl IntoResponse, CuratorError> {
    let status = curator.toggle_favorite(user_id, song_id)?;
    let message = match status {
        ToggleOutcome::Added => format!("Song {} added to favorites", song_id),
        ToggleOutcome::Removed => format!("Song {} removed from favorites", song_id),
    };
    Ok(Json(ToggleResponse { status, message }))
}

async fn list_playlist_items(
    State(curator): State<GuardedCurator>,
    Path(playlist_id): Path<PlaylistId>,
) -> Result<impl IntoResponse, CuratorError> {
    Ok(Json(curator.list_playlist_items(playlist_id)?))
}

async fn add_song_to_playlist(
    State(curator): State<GuardedCurator>,
    Path((playlist_id, song_id)): Path<(PlaylistId, SongId)>,
) -> Result<impl IntoResponse, CuratorError> {
    Ok(Json(curator.add_song(playlist_id, song_id)?))
}

async fn remove_song_from_playlist(
    State(curator): State<GuardedCurator>,
    Path((playlist_id, song_id)): Path<(PlaylistId, SongId)>,
) -> Result<impl IntoResponse, CuratorError> {
    curator.remove_song(playlist_id, song_id)?;
    Ok(StatusCode::OK)
}

pub fn make_app<S: MusicStore + 'static>(config: ServerConfig, store: Arc<S>) -> Result<Router> {
    let state = ServerState {
        config: config.clone(),
        start_time: Instant::now(),
        music_store: store.clone(),
        matcher: Arc::new(SimilarityMatcher::new(store.clone())),
        curator: Arc::new(PlaylistCurator::new(store)),
        hash: env!("GIT_HASH").to_string(),
    };

    let user_routes: Router = Router::new()
        .route("/", post(create_user))
        .route("/{user_id}", get(get_user))
        .route("/{user_id}/profile", put(put_profile))
        .route("/{user_id}/matches", get(get_matches))
        .route(
            "/{user_id}/playlists",
            post(create_playlist).get(list_playlists),
        )
        .route("/{user_id}/favorites", get(get_favorites))
        .route(
            "/{user_id}/favorites/{song_id}/toggle",
            post(toggle_favorite),
        )
        .with_state(state.clone());

    let song_routes: Router = Router::new()
        .route("/", post(create_song))
        .route("/{song_id}", get(get_song))
        .with_state(state.clone());

    let question_routes: Router = Router::new()
        .route("/", get(get_questions))
        .with_state(state.clone());

    let playlist_routes: Router = Router::new()
        .route("/{playlist_id}/items", get(list_playlist_items))
        .route(
            "/{playlist_id}/songs/{song_id}",
            put(add_song_to_playlist).delete(remove_song_from_playlist),
        )
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let app: Router = home_router
        .nest("/v1/users", user_routes)
        .nest("/v1/songs", song_routes)
        .nest("/v1/questions", question_routes)
        .nest("/v1/playlists", playlist_routes)
        .layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

pub async fn run_server<S: MusicStore + 'static>(
    config: ServerConfig,
    metrics_port: u16,
    store: Arc<S>,
) -> Result<()> {
    let port = config.port;
    let app = make_app(config, store)?;

    let metrics_app = Router::new().route("/metrics", get(metrics_handler));
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Could not bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Could not bind port {}", port))?;

    Ok(axum::serve(listener, app).await?)
}
