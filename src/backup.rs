use crate::api::{PlaylistItem, Provider};
use crate::models::{BackupReport, PlaylistRecord, SkippedPlaylist, TrackRecord};
use anyhow::Result;

/// Convert one remote playlist-item entry into a flat transfer record.
///
/// Returns None for entries with no resolvable track: removed or local
/// tracks come back with an empty name, and those must never enter the
/// transfer document. A track without a URI is equally unusable and is
/// filtered here, before insertion. Multi-artist tracks keep only the
/// first listed artist.
pub fn normalize_item(item: &PlaylistItem) -> Option<TrackRecord> {
    let track = item.track.as_ref()?;
    if track.name.is_empty() || track.uri.is_empty() {
        return None;
    }
    Some(TrackRecord {
        name: track.name.clone(),
        artist: track
            .artists
            .first()
            .map(|a| a.name.clone())
            .unwrap_or_default(),
        album: track.album.name.clone(),
        uri: track.uri.clone(),
    })
}

/// Fetch every item of a playlist in pages of `page_size`, walking offsets
/// 0, page_size, 2*page_size, ...
///
/// A page shorter than `page_size` marks the last page; the remote
/// total-count field is not consulted. Any page error fails the whole
/// playlist and discards what was accumulated so far.
pub async fn fetch_all_tracks(
    provider: &dyn Provider,
    playlist_id: &str,
    page_size: usize,
) -> Result<Vec<PlaylistItem>> {
    anyhow::ensure!(page_size > 0, "page_size must be positive");

    let mut items = Vec::new();
    let mut offset = 0usize;
    loop {
        let page = provider
            .list_playlist_items(playlist_id, page_size, offset)
            .await?;
        let page_len = page.len();
        items.extend(page);
        if page_len < page_size {
            break;
        }
        offset += page_size;
    }
    Ok(items)
}

/// Assemble the transfer document across every playlist visible to the
/// authenticated user.
///
/// Backup is best-effort per playlist: a playlist whose fetch fails is
/// logged, recorded in the report and omitted from the document. Only the
/// initial playlist listing is fatal.
pub async fn assemble_backup(provider: &dyn Provider, page_size: usize) -> Result<BackupReport> {
    let playlists = provider.list_user_playlists().await?;

    let mut report = BackupReport::default();
    for summary in playlists {
        let items = match fetch_all_tracks(provider, &summary.id, page_size).await {
            Ok(items) => items,
            Err(e) => {
                log::warn!("Skipping playlist {} ({}): {}", summary.name, summary.id, e);
                report.skipped.push(SkippedPlaylist {
                    name: summary.name,
                    error: e.to_string(),
                });
                continue;
            }
        };
        let tracks: Vec<TrackRecord> = items.iter().filter_map(normalize_item).collect();
        log::info!("Backed up playlist {} ({} tracks)", summary.name, tracks.len());
        report.document.push(PlaylistRecord {
            name: summary.name,
            tracks,
        });
    }
    Ok(report)
}
