use super::spotify::StoredToken;
use crate::config::Config;
use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use rand::{distributions::Alphanumeric, Rng};
use reqwest::Client;
use serde::Deserialize;
use std::env;
use url::Url;

/// OAuth helper for the web login flow:
/// 1. `/login` redirects the browser to `authorize_url()`.
/// 2. The service redirects back to the configured redirect URI carrying a
///    `code` and the anti-forgery `state` token.
/// 3. `exchange_code` trades the code for tokens over the token endpoint
///    using HTTP Basic client credentials.
///
/// The state token is generated once at startup and stays fixed for the
/// process lifetime; the callback handler rejects mismatches.
#[derive(Debug, Clone)]
pub struct SpotifyAuth {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    state: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

const SCOPES: &[&str] = &[
    "playlist-read-private",
    "playlist-read-collaborative",
    "user-library-read",
    "playlist-modify-public",
    "playlist-modify-private",
];

pub fn auth_base() -> String {
    env::var("SPOTIFY_AUTH_BASE").unwrap_or_else(|_| "https://accounts.spotify.com".into())
}

fn generate_state_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

impl SpotifyAuth {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            client_id: cfg.client_id.clone(),
            client_secret: cfg.client_secret.clone(),
            redirect_uri: cfg.redirect_uri.clone(),
            state: generate_state_token(),
        }
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// Build the authorization URL the browser is redirected to.
    pub fn authorize_url(&self) -> Result<String> {
        let mut url = Url::parse(&auth_base())?.join("/authorize")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", &self.state);
        Ok(url.to_string())
    }

    /// Exchange the callback `code` for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<StoredToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", self.client_id, self.client_secret))
        );
        let url = format!("{}/api/token", auth_base());
        let resp = self
            .client
            .post(&url)
            .header("Authorization", auth_header)
            .form(&params)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let txt = resp.text().await.unwrap_or_default();
            return Err(anyhow!("token exchange failed: {} => {}", status, txt));
        }

        let tr: TokenResponse = resp.json().await?;
        let expires_at = chrono::Utc::now().timestamp() + tr.expires_in;
        Ok(StoredToken {
            access_token: tr.access_token,
            token_type: tr.token_type,
            expires_at,
            refresh_token: tr.refresh_token,
            scope: tr.scope,
        })
    }
}
