use super::{PlaylistItem, PlaylistSummary, Provider};
use crate::models::TRACK_URI_PREFIX;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::warn;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::env;

/// Token obtained from the authorization code exchange. Held in the
/// session for the lifetime of the process; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: i64, // epoch seconds
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// Spotify provider backed by the Spotify Web API.
/// Endpoints may be overridden by SPOTIFY_AUTH_BASE and SPOTIFY_API_BASE env vars (useful for tests).
pub struct SpotifyProvider {
    client: Client,
    access_token: String,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

impl SpotifyProvider {
    pub fn new(access_token: String, max_retries: u32) -> Self {
        Self {
            client: Client::new(),
            access_token,
            max_retries: max_retries.max(1),
        }
    }

    fn name(&self) -> &str {
        "spotify"
    }

    fn is_authenticated(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn api_base() -> String {
        // include v1 path by default
        env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Send one API call, honoring Retry-After on 429 for up to
    /// `max_retries` attempts. With max_retries = 1 a rate-limit response
    /// surfaces immediately as a `rate_limited` error.
    async fn request_json(
        &self,
        what: &str,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let mut req = self
                .client
                .request(method.clone(), url)
                .header(AUTHORIZATION, self.bearer());
            if let Some(b) = &body {
                req = req.header(CONTENT_TYPE, "application/json").json(b);
            }
            let resp = req.send().await?;
            let status = resp.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                if attempt >= self.max_retries {
                    return Err(anyhow!(
                        "{} failed: rate_limited: retry_after={:?}",
                        what,
                        retry_after
                    ));
                }
                let wait = retry_after.unwrap_or_else(|| std::cmp::min(1u64 << attempt, 60));
                warn!("{}: rate limited, sleeping {}s before retry", what, wait);
                tokio::time::sleep(std::time::Duration::from_secs(wait + 1)).await;
                continue;
            }

            if !status.is_success() {
                let txt = resp.text().await.unwrap_or_default();
                return Err(anyhow!("{} failed: {} => {}", what, status, txt));
            }
            return Ok(resp.json().await?);
        }
    }
}

#[async_trait]
impl Provider for SpotifyProvider {
    fn name(&self) -> &str {
        SpotifyProvider::name(self)
    }

    fn is_authenticated(&self) -> bool {
        SpotifyProvider::is_authenticated(self)
    }

    async fn current_user_id(&self) -> Result<String> {
        let url = format!("{}/me", Self::api_base());
        let j = self.request_json("fetch user", Method::GET, &url, None).await?;
        let id = j["id"]
            .as_str()
            .ok_or_else(|| anyhow!("no id"))?
            .to_string();
        Ok(id)
    }

    async fn list_user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        let mut playlists = Vec::new();
        let mut next_url = Some(format!("{}/me/playlists?limit=50", Self::api_base()));
        while let Some(url) = next_url {
            let j = self
                .request_json("list playlists", Method::GET, &url, None)
                .await?;
            if let Some(items) = j["items"].as_array() {
                for pl in items {
                    playlists.push(PlaylistSummary {
                        id: pl["id"].as_str().unwrap_or("").to_string(),
                        name: pl["name"].as_str().unwrap_or("").to_string(),
                    });
                }
            }
            next_url = j["next"].as_str().map(|s| s.to_string());
        }
        Ok(playlists)
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PlaylistItem>> {
        let url = format!(
            "{}/playlists/{}/tracks?limit={}&offset={}",
            Self::api_base(),
            playlist_id,
            limit,
            offset
        );
        let j = self
            .request_json("list playlist items", Method::GET, &url, None)
            .await?;
        let page: PlaylistItemsPage = serde_json::from_value(j)?;
        Ok(page.items)
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
        collaborative: bool,
    ) -> Result<String> {
        let url = format!(
            "{}/users/{}/playlists",
            Self::api_base(),
            url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect::<String>()
        );
        let body = json!({
            "name": name,
            "description": description,
            "public": public,
            "collaborative": collaborative
        });
        let j = self
            .request_json("create playlist", Method::POST, &url, Some(body))
            .await?;
        let id = j["id"]
            .as_str()
            .ok_or_else(|| anyhow!("no id"))?
            .to_string();
        Ok(id)
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        let uris: Vec<String> = track_ids
            .iter()
            .map(|id| format!("{}{}", TRACK_URI_PREFIX, id))
            .collect();
        let url = format!("{}/playlists/{}/tracks", Self::api_base(), playlist_id);
        let body = json!({ "uris": uris });
        self.request_json("add tracks", Method::POST, &url, Some(body))
            .await?;
        Ok(())
    }
}
