use serde::{Deserialize, Serialize};

/// Scheme prefix of a track URI. Restore derives remote track ids by
/// stripping this prefix after validating it is actually present.
pub const TRACK_URI_PREFIX: &str = "spotify:track:";

/// One track of the transfer document. Immutable once created; the URI is
/// the dedup and restore key and is never empty inside a playlist record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub uri: String,
}

/// One playlist of the transfer document. Track order is significant and
/// preserved by restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistRecord {
    pub name: String,
    pub tracks: Vec<TrackRecord>,
}

/// The portable artifact exchanged between backup and restore. Serializes
/// as a top-level JSON array of playlists.
pub type TransferDocument = Vec<PlaylistRecord>;

/// Emitted after each attempted batch during restore.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub playlist_name: String,
    pub percent_complete: f64,
    pub range_start: usize,
    pub range_end: usize,
    pub total_tracks: usize,
}

/// Emitted once all of a playlist's batches have been attempted. The count
/// reflects attempted tracks, not tracks confirmed added.
#[derive(Debug, Clone, Serialize)]
pub struct CompletionEvent {
    pub playlist_name: String,
    pub total_tracks_attempted: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RestoreEvent {
    Progress(ProgressEvent),
    Completed(CompletionEvent),
}

/// Final state of one playlist's restoration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlaylistOutcome {
    Done,
    Failed { reason: String },
}

/// A track skipped during restore because its URI yields no usable id.
#[derive(Debug, Clone, Serialize)]
pub struct TrackSkip {
    pub uri: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistRestoreReport {
    pub name: String,
    pub outcome: PlaylistOutcome,
    pub total_tracks_attempted: usize,
    pub failed_batches: usize,
    pub skipped_tracks: Vec<TrackSkip>,
}

/// Per-playlist outcomes of one restore run. Absorbed errors (create,
/// batch, malformed track) are visible here rather than only in log lines.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RestoreReport {
    pub playlists: Vec<PlaylistRestoreReport>,
}

/// A playlist omitted from the backup because its track fetch failed.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedPlaylist {
    pub name: String,
    pub error: String,
}

/// Result of one backup run: the transfer document plus the playlists that
/// were silently omitted from it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BackupReport {
    pub document: TransferDocument,
    pub skipped: Vec<SkippedPlaylist>,
}
