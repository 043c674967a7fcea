use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors surfaced to the end user as HTTP responses. Per-item failures
/// (playlist fetch, creation, batch submission, malformed tracks) never
/// reach this type; they are absorbed into logs and reports.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Couldn't get token")]
    Token(#[source] anyhow::Error),

    #[error("Couldn't get playlists")]
    Playlists(#[source] anyhow::Error),

    #[error("Error reading file")]
    UploadRead(#[source] anyhow::Error),

    #[error("Error parsing JSON")]
    UploadParse(#[source] serde_json::Error),

    #[error("Error getting user info")]
    UserInfo(#[source] anyhow::Error),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Token(e) => {
                log::warn!("Token exchange failed: {:?}", e);
                StatusCode::FORBIDDEN
            }
            AppError::Playlists(e) => {
                log::error!("Playlist listing failed: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::UploadRead(e) => {
                log::warn!("Upload read failed: {:?}", e);
                StatusCode::BAD_REQUEST
            }
            AppError::UploadParse(e) => {
                log::warn!("Upload parse failed: {}", e);
                StatusCode::BAD_REQUEST
            }
            AppError::UserInfo(e) => {
                log::error!("User lookup failed: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(e) => {
                log::error!("Internal error: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
