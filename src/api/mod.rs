pub mod spotify;
pub mod spotify_auth;
pub mod mock;

use anyhow::Result;
use serde::Deserialize;

/// One playlist as listed for the authenticated user.
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
}

/// One entry of a playlist's track list as returned by the remote API.
/// `track` is absent (or carries an empty name) for entries whose track is
/// no longer resolvable, e.g. removed or local tracks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistItem {
    #[serde(default)]
    pub track: Option<ItemTrack>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemTrack {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub album: AlbumRef,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArtistRef {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub name: String,
}

/// Provider trait: the remote-API operations backup and restore need.
/// Implementations: spotify::SpotifyProvider and mock::MockProvider.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Resolve the authenticated user's id.
    async fn current_user_id(&self) -> Result<String>;

    /// List the playlists owned by or visible to the authenticated user.
    async fn list_user_playlists(&self) -> Result<Vec<PlaylistSummary>>;

    /// Fetch one page of a playlist's items. Paging across offsets is the
    /// caller's job; a single call returns at most `limit` items.
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PlaylistItem>>;

    /// Create a playlist for `user_id` and return the remote playlist id.
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
        collaborative: bool,
    ) -> Result<String>;

    /// Add tracks (ids, batching done by caller) to a playlist.
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()>;

    /// Return the provider's name (for logging, UI, etc)
    fn name(&self) -> &str;

    /// Return true if the provider holds a usable access token
    fn is_authenticated(&self) -> bool;
}
