use super::{PlaylistItem, PlaylistSummary, Provider};
use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

/// A simple mock provider used in tests and when no real credentials are present.
/// It logs operations and returns deterministic fake IDs.
pub struct MockProvider {}

impl MockProvider {
    pub fn new() -> Self {
        Self {}
    }
    fn is_authenticated(&self) -> bool {
        false
    }
    fn name(&self) -> &str {
        "mock"
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        MockProvider::name(self)
    }
    fn is_authenticated(&self) -> bool {
        MockProvider::is_authenticated(self)
    }

    async fn current_user_id(&self) -> Result<String> {
        Ok("mock-user".to_string())
    }

    async fn list_user_playlists(&self) -> Result<Vec<PlaylistSummary>> {
        Ok(Vec::new())
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        _limit: usize,
        _offset: usize,
    ) -> Result<Vec<PlaylistItem>> {
        info!("MockProvider: list_playlist_items {}", playlist_id);
        Ok(Vec::new())
    }

    async fn create_playlist(
        &self,
        _user_id: &str,
        name: &str,
        _description: &str,
        _public: bool,
        _collaborative: bool,
    ) -> Result<String> {
        info!("MockProvider: create_playlist {}", name);
        Ok(format!("mock-playlist-{}", name))
    }

    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<()> {
        info!(
            "MockProvider: add_tracks {} -> {} tracks",
            playlist_id,
            track_ids.len()
        );
        Ok(())
    }
}
