use crate::api::spotify::SpotifyProvider;
use crate::api::spotify_auth::SpotifyAuth;
use crate::backup;
use crate::config::Config;
use crate::error::{AppError, Result as HttpResult};
use crate::models::{PlaylistOutcome, TransferDocument};
use crate::restore;
use crate::session::SessionStore;
use anyhow::anyhow;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Multipart, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

const SESSION_COOKIE: &str = "sid";

/// Shared application state: configuration, the OAuth helper with its
/// process-fixed state token, the session registry, and the restore
/// progress broadcast feeding `/ws`.
pub struct AppState {
    pub cfg: Config,
    pub auth: SpotifyAuth,
    pub sessions: SessionStore,
    pub events: broadcast::Sender<String>,
}

impl AppState {
    pub fn new(cfg: Config) -> Self {
        let auth = SpotifyAuth::from_config(&cfg);
        let (events, _) = broadcast::channel(256);
        Self {
            cfg,
            auth,
            sessions: SessionStore::new(),
            events,
        }
    }

    fn provider(&self, access_token: String) -> SpotifyProvider {
        SpotifyProvider::new(access_token, self.cfg.max_retries_on_error)
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.cfg.static_dir.clone();
    Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/download", get(download))
        .route("/restore", get(restore_form).post(restore_upload))
        .route("/ws", get(ws_feed))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

async fn index() -> Html<String> {
    Html(pages::index())
}

async fn login(State(state): State<Arc<AppState>>) -> HttpResult<Redirect> {
    let url = state.auth.authorize_url().map_err(AppError::Internal)?;
    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// Token exchange plus the whole backup run. The request blocks until the
/// last playlist page has been fetched.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> HttpResult<Response> {
    if let Some(e) = query.error {
        return Err(AppError::Token(anyhow!("authorization denied: {}", e)));
    }
    if query.state.as_deref() != Some(state.auth.state()) {
        return Err(AppError::Token(anyhow!("state token mismatch")));
    }
    let code = query
        .code
        .ok_or_else(|| AppError::Token(anyhow!("missing code parameter")))?;
    let token = state
        .auth
        .exchange_code(&code)
        .await
        .map_err(AppError::Token)?;

    let provider = state.provider(token.access_token.clone());
    let sid = state.sessions.create(token).await;

    let report = backup::assemble_backup(&provider, state.cfg.page_size)
        .await
        .map_err(AppError::Playlists)?;
    state
        .sessions
        .set_document(&sid, report.document.clone())
        .await;

    let cookie = format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, sid);
    Ok(([(header::SET_COOKIE, cookie)], Html(pages::playlists(&report))).into_response())
}

async fn download(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let Some(sid) = session_id(&headers) else {
        return Redirect::to("/login").into_response();
    };
    if state.sessions.token(&sid).await.is_none() {
        return Redirect::to("/login").into_response();
    }
    let document: TransferDocument = state.sessions.document(&sid).await.unwrap_or_default();
    let body = match serde_json::to_string(&document) {
        Ok(body) => body,
        Err(e) => return AppError::Internal(anyhow!(e)).into_response(),
    };
    (
        [
            (header::CONTENT_TYPE, "application/json"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=spotify_backup.json",
            ),
        ],
        body,
    )
        .into_response()
}

async fn restore_form(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    match session_id(&headers) {
        Some(sid) if state.sessions.token(&sid).await.is_some() => {
            Html(pages::restore_form()).into_response()
        }
        _ => Redirect::to("/login").into_response(),
    }
}

/// Upload a transfer document and re-create its playlists. Individual
/// playlist failures are absorbed into the report; the response redirects
/// to `/` regardless, matching the best-effort contract.
async fn restore_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> HttpResult<Response> {
    let token = match session_id(&headers) {
        Some(sid) => state.sessions.token(&sid).await,
        None => None,
    };
    let Some(token) = token else {
        return Ok(Redirect::to("/login").into_response());
    };

    let mut payload: Option<axum::body::Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::UploadRead(anyhow!(e)))?
    {
        if field.name() == Some("backup") {
            payload = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| AppError::UploadRead(anyhow!(e)))?,
            );
            break;
        }
    }
    let payload =
        payload.ok_or_else(|| AppError::UploadRead(anyhow!("missing `backup` file field")))?;
    let document: TransferDocument =
        serde_json::from_slice(&payload).map_err(AppError::UploadParse)?;

    let provider = state.provider(token.access_token.clone());
    let events = state.events.clone();
    let report = restore::restore_playlists(
        &provider,
        &document,
        state.cfg.max_batch_size,
        |event| {
            if let Ok(json) = serde_json::to_string(event) {
                let _ = events.send(json);
            }
        },
    )
    .await
    .map_err(AppError::UserInfo)?;

    for playlist in &report.playlists {
        match &playlist.outcome {
            PlaylistOutcome::Done => log::info!(
                "Restored playlist {} ({} tracks attempted, {} failed batches)",
                playlist.name,
                playlist.total_tracks_attempted,
                playlist.failed_batches
            ),
            PlaylistOutcome::Failed { reason } => {
                log::error!("Playlist {} failed: {}", playlist.name, reason)
            }
        }
    }

    Ok(Redirect::to("/").into_response())
}

async fn ws_feed(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    let rx = state.events.subscribe();
    ws.on_upgrade(move |socket| stream_events(socket, rx))
}

async fn stream_events(mut socket: WebSocket, mut rx: broadcast::Receiver<String>) {
    loop {
        match rx.recv().await {
            Ok(message) => {
                if socket.send(Message::Text(message)).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("Progress feed lagged, {} events dropped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

mod pages {
    use crate::models::BackupReport;

    fn escape(s: &str) -> String {
        s.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
    }

    fn layout(title: &str, body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
             <link rel=\"stylesheet\" href=\"/static/css/style.css\"></head>\
             <body><h1>{title}</h1>{body}</body></html>"
        )
    }

    pub(super) fn index() -> String {
        layout(
            "Playlist Backup",
            "<ul>\
             <li><a href=\"/login\">Log in and back up your playlists</a></li>\
             <li><a href=\"/download\">Download the last backup</a></li>\
             <li><a href=\"/restore\">Restore from a backup file</a></li>\
             </ul>",
        )
    }

    pub(super) fn playlists(report: &BackupReport) -> String {
        let mut body = String::from("<p>Backup complete.</p><ul>");
        for playlist in &report.document {
            body.push_str(&format!(
                "<li>{} ({} tracks)</li>",
                escape(&playlist.name),
                playlist.tracks.len()
            ));
        }
        body.push_str("</ul>");
        if !report.skipped.is_empty() {
            body.push_str("<p>Skipped (fetch failed):</p><ul>");
            for skipped in &report.skipped {
                body.push_str(&format!("<li>{}</li>", escape(&skipped.name)));
            }
            body.push_str("</ul>");
        }
        body.push_str("<p><a href=\"/download\">Download backup file</a></p>");
        layout("Your Playlists", &body)
    }

    pub(super) fn restore_form() -> String {
        layout(
            "Restore Playlists",
            "<form id=\"restoreForm\" action=\"/restore\" method=\"post\" enctype=\"multipart/form-data\">\
             <input type=\"file\" name=\"backup\" accept=\"application/json\" required>\
             <button type=\"submit\">Restore</button>\
             </form>\
             <div id=\"progressContainer\" style=\"display:none\">\
             <div id=\"progressBar\"></div>\
             <p id=\"progressText\"></p>\
             <p id=\"currentPlaylist\"></p>\
             </div>\
             <script src=\"/static/js/progress.js\"></script>",
        )
    }
}
