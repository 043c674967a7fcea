use crate::api::spotify::StoredToken;
use crate::models::TransferDocument;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Per-browser-session state: the authorization token from the OAuth
/// callback plus the most recently assembled transfer document. Held in
/// process memory only; gone on restart.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: StoredToken,
    pub document: Option<TransferDocument>,
}

/// Session registry keyed by the `sid` cookie value, safe to share across
/// concurrent requests.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh session for `token` and return its id.
    pub async fn create(&self, token: StoredToken) -> String {
        let sid = Uuid::new_v4().to_string();
        self.inner.write().await.insert(
            sid.clone(),
            Session {
                token,
                document: None,
            },
        );
        sid
    }

    pub async fn token(&self, sid: &str) -> Option<StoredToken> {
        self.inner.read().await.get(sid).map(|s| s.token.clone())
    }

    pub async fn set_document(&self, sid: &str, document: TransferDocument) {
        if let Some(session) = self.inner.write().await.get_mut(sid) {
            session.document = Some(document);
        }
    }

    pub async fn document(&self, sid: &str) -> Option<TransferDocument> {
        self.inner
            .read()
            .await
            .get(sid)
            .and_then(|s| s.document.clone())
    }
}
