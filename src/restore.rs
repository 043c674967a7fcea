use crate::api::Provider;
use crate::models::{
    CompletionEvent, PlaylistOutcome, PlaylistRecord, PlaylistRestoreReport, ProgressEvent,
    RestoreEvent, RestoreReport, TrackRecord, TrackSkip, TRACK_URI_PREFIX,
};
use anyhow::{Context, Result};

/// A transfer-document entry whose URI cannot yield a usable track id.
/// These skip the single track, never the batch it would have landed in.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TrackUriError {
    #[error("unsupported uri scheme: {0:?}")]
    UnsupportedScheme(String),
    #[error("empty track id in uri: {0:?}")]
    EmptyId(String),
}

/// Drop repeated tracks by URI, keeping the first occurrence of each
/// distinct URI in original order.
pub fn dedupe_tracks(tracks: &[TrackRecord]) -> Vec<TrackRecord> {
    let mut seen = std::collections::HashSet::new();
    let mut result = tracks.to_vec();
    result.retain(|t| seen.insert(t.uri.clone()));
    result
}

/// Derive the remote track id by stripping the URI's scheme prefix.
/// The prefix is validated, not assumed: a URI that does not start with
/// `spotify:track:`, or carries nothing after it, is rejected rather than
/// truncated into a wrong id.
pub fn track_id_from_uri(uri: &str) -> Result<&str, TrackUriError> {
    let id = uri
        .strip_prefix(TRACK_URI_PREFIX)
        .ok_or_else(|| TrackUriError::UnsupportedScheme(uri.to_string()))?;
    if id.is_empty() {
        return Err(TrackUriError::EmptyId(uri.to_string()));
    }
    Ok(id)
}

/// Re-create every playlist in the document for the authenticated user.
///
/// Per playlist the state machine is CreateEmpty -> AddBatches -> Done, or
/// CreateEmpty -> Failed when the remote refuses the creation: that
/// playlist is skipped and the run continues with the next one. Failed
/// batches are logged, counted and skipped; the processed count still
/// advances per attempted batch, so the final progress event always
/// reports 100% once every batch has been attempted.
///
/// Only the target-user lookup is fatal. Everything else lands in the
/// returned report, with `emit` receiving a progress event after each
/// attempted batch and a completion event per finished playlist.
pub async fn restore_playlists<F>(
    provider: &dyn Provider,
    document: &[PlaylistRecord],
    batch_size: usize,
    mut emit: F,
) -> Result<RestoreReport>
where
    F: FnMut(&RestoreEvent),
{
    anyhow::ensure!(batch_size > 0, "batch_size must be positive");

    let user_id = provider
        .current_user_id()
        .await
        .context("fetching target user")?;

    let mut report = RestoreReport::default();
    for playlist in document {
        log::info!("Processing playlist: {}", playlist.name);

        let tracks = dedupe_tracks(&playlist.tracks);

        let playlist_id = match provider
            .create_playlist(&user_id, &playlist.name, "", false, false)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                log::error!("Failed to create playlist {}: {}", playlist.name, e);
                report.playlists.push(PlaylistRestoreReport {
                    name: playlist.name.clone(),
                    outcome: PlaylistOutcome::Failed {
                        reason: e.to_string(),
                    },
                    total_tracks_attempted: 0,
                    failed_batches: 0,
                    skipped_tracks: Vec::new(),
                });
                continue;
            }
        };

        let mut skipped_tracks = Vec::new();
        let mut track_ids = Vec::new();
        for track in &tracks {
            match track_id_from_uri(&track.uri) {
                Ok(id) => track_ids.push(id.to_string()),
                Err(e) => {
                    log::warn!("Skipping track with malformed uri {:?}: {}", track.uri, e);
                    skipped_tracks.push(TrackSkip {
                        uri: track.uri.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let total_tracks = track_ids.len();
        let mut processed = 0usize;
        let mut failed_batches = 0usize;
        for (batch_index, batch) in track_ids.chunks(batch_size).enumerate() {
            let range_start = batch_index * batch_size + 1;
            let range_end = batch_index * batch_size + batch.len();

            if let Err(e) = provider.add_tracks(&playlist_id, batch).await {
                log::error!(
                    "Error adding tracks batch to playlist {}: {}",
                    playlist.name,
                    e
                );
                failed_batches += 1;
            }

            processed += batch.len();
            let percent = processed as f64 / total_tracks as f64 * 100.0;
            log::info!(
                "Playlist: {} - Progress: {:.2}% - Adding tracks {}-{} of {}",
                playlist.name,
                percent,
                range_start,
                range_end,
                total_tracks
            );
            emit(&RestoreEvent::Progress(ProgressEvent {
                playlist_name: playlist.name.clone(),
                percent_complete: percent,
                range_start,
                range_end,
                total_tracks,
            }));
        }

        log::info!(
            "Completed playlist: {} - Attempted {} unique tracks",
            playlist.name,
            total_tracks
        );
        emit(&RestoreEvent::Completed(CompletionEvent {
            playlist_name: playlist.name.clone(),
            total_tracks_attempted: total_tracks,
        }));
        report.playlists.push(PlaylistRestoreReport {
            name: playlist.name.clone(),
            outcome: PlaylistOutcome::Done,
            total_tracks_attempted: total_tracks,
            failed_batches,
            skipped_tracks,
        });
    }
    Ok(report)
}
