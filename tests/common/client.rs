//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server route. When API routes or
//! request formats change, update only this file.

use super::constants::*;
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    // ========================================================================
    // Users
    // ========================================================================

    pub async fn create_user(&self, handle: &str, email: &str) -> Response {
        self.client
            .post(self.url("/v1/users"))
            .json(&json!({ "handle": handle, "email": email }))
            .send()
            .await
            .expect("Create user request failed")
    }

    pub async fn get_user(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/users/{}", user_id)).await
    }

    pub async fn put_profile(&self, user_id: usize, body: serde_json::Value) -> Response {
        self.client
            .put(self.url(&format!("/v1/users/{}/profile", user_id)))
            .json(&body)
            .send()
            .await
            .expect("Put profile request failed")
    }

    pub async fn get_matches(&self, user_id: usize, top_k: Option<usize>) -> Response {
        match top_k {
            Some(top_k) => {
                self.get(&format!("/v1/users/{}/matches?top_k={}", user_id, top_k))
                    .await
            }
            None => self.get(&format!("/v1/users/{}/matches", user_id)).await,
        }
    }

    // ========================================================================
    // Songs
    // ========================================================================

    pub async fn create_song(&self, title: &str) -> Response {
        self.client
            .post(self.url("/v1/songs"))
            .json(&json!({ "title": title }))
            .send()
            .await
            .expect("Create song request failed")
    }

    pub async fn get_song(&self, song_id: usize) -> Response {
        self.get(&format!("/v1/songs/{}", song_id)).await
    }

    // ========================================================================
    // Questions
    // ========================================================================

    pub async fn get_questions(&self) -> Response {
        self.get("/v1/questions").await
    }

    // ========================================================================
    // Playlists
    // ========================================================================

    pub async fn create_playlist(&self, user_id: usize, name: &str, is_favorite: bool) -> Response {
        self.client
            .post(self.url(&format!("/v1/users/{}/playlists", user_id)))
            .json(&json!({ "name": name, "is_favorite": is_favorite }))
            .send()
            .await
            .expect("Create playlist request failed")
    }

    pub async fn list_playlists(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/users/{}/playlists", user_id)).await
    }

    pub async fn get_favorites(&self, user_id: usize) -> Response {
        self.get(&format!("/v1/users/{}/favorites", user_id)).await
    }

    pub async fn toggle_favorite(&self, user_id: usize, song_id: usize) -> Response {
        self.client
            .post(self.url(&format!(
                "/v1/users/{}/favorites/{}/toggle",
                user_id, song_id
            )))
            .send()
            .await
            .expect("Toggle favorite request failed")
    }

    pub async fn list_playlist_items(&self, playlist_id: usize) -> Response {
        self.get(&format!("/v1/playlists/{}/items", playlist_id))
            .await
    }

    pub async fn add_song(&self, playlist_id: usize, song_id: usize) -> Response {
        self.client
            .put(self.url(&format!(
                "/v1/playlists/{}/songs/{}",
                playlist_id, song_id
            )))
            .send()
            .await
            .expect("Add song request failed")
    }

    pub async fn remove_song(&self, playlist_id: usize, song_id: usize) -> Response {
        self.client
            .delete(self.url(&format!(
                "/v1/playlists/{}/songs/{}",
                playlist_id, song_id
            )))
            .send()
            .await
            .expect("Remove song request failed")
    }
}
