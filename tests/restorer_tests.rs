use async_trait::async_trait;
use playlist_online_backup::api::{PlaylistItem, PlaylistSummary, Provider};
use playlist_online_backup::models::{PlaylistOutcome, PlaylistRecord, RestoreEvent, TrackRecord};
use playlist_online_backup::restore::{restore_playlists, track_id_from_uri, TrackUriError};
use std::collections::HashSet;
use std::sync::Mutex;

fn track(uri: &str) -> TrackRecord {
    TrackRecord {
        name: "Song".to_string(),
        artist: "Artist".to_string(),
        album: "Album".to_string(),
        uri: uri.to_string(),
    }
}

fn playlist(name: &str, uris: &[String]) -> PlaylistRecord {
    PlaylistRecord {
        name: name.to_string(),
        tracks: uris.iter().map(|u| track(u)).collect(),
    }
}

// Records creations and submitted batches; creation or specific batch
// indices can be made to fail.
struct RecordingProvider {
    created: Mutex<Vec<String>>,
    batches: Mutex<Vec<(String, Vec<String>)>>,
    fail_create: HashSet<String>,
    fail_batch_index: Option<usize>,
}

impl RecordingProvider {
    fn new() -> Self {
        Self {
            created: Mutex::new(Vec::new()),
            batches: Mutex::new(Vec::new()),
            fail_create: HashSet::new(),
            fail_batch_index: None,
        }
    }

    fn batches_for(&self, playlist_id: &str) -> Vec<Vec<String>> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == playlist_id)
            .map(|(_, batch)| batch.clone())
            .collect()
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    async fn current_user_id(&self) -> anyhow::Result<String> {
        Ok("user".into())
    }
    async fn list_user_playlists(&self) -> anyhow::Result<Vec<PlaylistSummary>> {
        Ok(Vec::new())
    }
    async fn list_playlist_items(
        &self,
        _playlist_id: &str,
        _limit: usize,
        _offset: usize,
    ) -> anyhow::Result<Vec<PlaylistItem>> {
        Ok(Vec::new())
    }
    async fn create_playlist(
        &self,
        _user_id: &str,
        name: &str,
        _description: &str,
        public: bool,
        collaborative: bool,
    ) -> anyhow::Result<String> {
        // restored playlists are always private and non-collaborative
        assert!(!public);
        assert!(!collaborative);
        if self.fail_create.contains(name) {
            anyhow::bail!("create refused");
        }
        self.created.lock().unwrap().push(name.to_string());
        Ok(format!("remote-{}", name))
    }
    async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> anyhow::Result<()> {
        let index = {
            let batches = self.batches.lock().unwrap();
            batches.iter().filter(|(id, _)| id == playlist_id).count()
        };
        self.batches
            .lock()
            .unwrap()
            .push((playlist_id.to_string(), track_ids.to_vec()));
        if self.fail_batch_index == Some(index) {
            anyhow::bail!("batch refused");
        }
        Ok(())
    }
    fn name(&self) -> &str {
        "recording"
    }
    fn is_authenticated(&self) -> bool {
        true
    }
}

fn unique_uris(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("spotify:track:{}", i)).collect()
}

#[tokio::test]
async fn batches_partition_and_concatenate_exactly() {
    let provider = RecordingProvider::new();
    let document = vec![playlist("Mix", &unique_uris(250))];

    let report = restore_playlists(&provider, &document, 100, |_| {})
        .await
        .unwrap();

    let batches = provider.batches_for("remote-Mix");
    assert_eq!(batches.len(), 3);
    assert_eq!(batches[0].len(), 100);
    assert_eq!(batches[1].len(), 100);
    assert_eq!(batches[2].len(), 50);

    let concatenated: Vec<String> = batches.into_iter().flatten().collect();
    let expected: Vec<String> = (0..250).map(|i| i.to_string()).collect();
    assert_eq!(concatenated, expected);

    assert_eq!(report.playlists[0].total_tracks_attempted, 250);
    assert_eq!(report.playlists[0].outcome, PlaylistOutcome::Done);
}

#[tokio::test]
async fn exact_multiple_yields_full_last_batch() {
    let provider = RecordingProvider::new();
    let document = vec![playlist("Mix", &unique_uris(200))];
    restore_playlists(&provider, &document, 100, |_| {})
        .await
        .unwrap();
    let batches = provider.batches_for("remote-Mix");
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[1].len(), 100);
}

#[tokio::test]
async fn progress_is_monotonic_and_ends_at_100() {
    let provider = RecordingProvider::new();
    let document = vec![playlist("Mix", &unique_uris(250))];

    let mut events: Vec<RestoreEvent> = Vec::new();
    restore_playlists(&provider, &document, 100, |event| events.push(event.clone()))
        .await
        .unwrap();

    let percents: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            RestoreEvent::Progress(p) => Some(p.percent_complete),
            _ => None,
        })
        .collect();
    assert_eq!(percents.len(), 3);
    assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    assert!((percents.last().unwrap() - 100.0).abs() < 1e-9);

    // completion event follows the last progress event
    match events.last().unwrap() {
        RestoreEvent::Completed(c) => {
            assert_eq!(c.playlist_name, "Mix");
            assert_eq!(c.total_tracks_attempted, 250);
        }
        other => panic!("expected completion event, got {:?}", other),
    }
}

#[tokio::test]
async fn duplicate_heavy_playlist_collapses_to_one_track() {
    let provider = RecordingProvider::new();
    let uris: Vec<String> = std::iter::repeat("spotify:track:same".to_string())
        .take(250)
        .collect();
    let document = vec![playlist("Dupes", &uris)];

    let mut completions = Vec::new();
    restore_playlists(&provider, &document, 100, |event| {
        if let RestoreEvent::Completed(c) = event {
            completions.push(c.total_tracks_attempted);
        }
    })
    .await
    .unwrap();

    assert_eq!(provider.created.lock().unwrap().len(), 1);
    let batches = provider.batches_for("remote-Dupes");
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], vec!["same".to_string()]);
    assert_eq!(completions, vec![1]);
}

#[tokio::test]
async fn failed_creation_skips_playlist_but_not_the_run() {
    let mut provider = RecordingProvider::new();
    provider.fail_create.insert("Second".to_string());
    let document = vec![
        playlist("First", &unique_uris(3)),
        playlist("Second", &unique_uris(3)),
    ];

    let report = restore_playlists(&provider, &document, 100, |_| {})
        .await
        .unwrap();

    assert_eq!(report.playlists.len(), 2);
    assert_eq!(report.playlists[0].outcome, PlaylistOutcome::Done);
    assert!(matches!(
        report.playlists[1].outcome,
        PlaylistOutcome::Failed { .. }
    ));
    // the failed playlist never reached the add-tracks stage
    assert_eq!(provider.batches_for("remote-First").len(), 1);
    assert!(provider.batches_for("remote-Second").is_empty());
}

#[tokio::test]
async fn failed_batch_is_skipped_not_retried() {
    let mut provider = RecordingProvider::new();
    provider.fail_batch_index = Some(0);
    let document = vec![playlist("Mix", &unique_uris(150))];

    let mut events = Vec::new();
    let report = restore_playlists(&provider, &document, 100, |e| events.push(e.clone()))
        .await
        .unwrap();

    // both batches were attempted exactly once
    assert_eq!(provider.batches_for("remote-Mix").len(), 2);
    assert_eq!(report.playlists[0].failed_batches, 1);
    assert_eq!(report.playlists[0].outcome, PlaylistOutcome::Done);

    // progress still reaches 100 even though the first batch failed
    let last_percent = events
        .iter()
        .rev()
        .find_map(|e| match e {
            RestoreEvent::Progress(p) => Some(p.percent_complete),
            _ => None,
        })
        .unwrap();
    assert!((last_percent - 100.0).abs() < 1e-9);
}

#[tokio::test]
async fn malformed_uris_skip_the_track_not_the_batch() {
    let provider = RecordingProvider::new();
    let uris = vec![
        "spotify:track:good1".to_string(),
        "spotify:album:notatrack".to_string(),
        "tidal:track:other".to_string(),
        "spotify:track:".to_string(),
        "spotify:track:good2".to_string(),
    ];
    let document = vec![playlist("Mixed", &uris)];

    let report = restore_playlists(&provider, &document, 100, |_| {})
        .await
        .unwrap();

    let batches = provider.batches_for("remote-Mixed");
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0], vec!["good1".to_string(), "good2".to_string()]);

    let pl = &report.playlists[0];
    assert_eq!(pl.outcome, PlaylistOutcome::Done);
    assert_eq!(pl.total_tracks_attempted, 2);
    assert_eq!(pl.skipped_tracks.len(), 3);
    assert!(pl.skipped_tracks.iter().any(|s| s.uri == "spotify:track:"));
}

#[tokio::test]
async fn empty_document_restores_nothing() {
    let provider = RecordingProvider::new();
    let report = restore_playlists(&provider, &[], 100, |_| {}).await.unwrap();
    assert!(report.playlists.is_empty());
    assert!(provider.created.lock().unwrap().is_empty());
}

#[test]
fn track_id_requires_the_exact_scheme_prefix() {
    assert_eq!(track_id_from_uri("spotify:track:abc123").unwrap(), "abc123");
    assert_eq!(
        track_id_from_uri("spotify:album:abc123"),
        Err(TrackUriError::UnsupportedScheme("spotify:album:abc123".into()))
    );
    assert_eq!(
        track_id_from_uri("tidal:track:1"),
        Err(TrackUriError::UnsupportedScheme("tidal:track:1".into()))
    );
    assert_eq!(
        track_id_from_uri(""),
        Err(TrackUriError::UnsupportedScheme("".into()))
    );
    assert_eq!(
        track_id_from_uri("spotify:track:"),
        Err(TrackUriError::EmptyId("spotify:track:".into()))
    );
}
