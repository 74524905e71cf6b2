use log::{debug, info};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Credentials shared by the API clients built from it.
///
/// A session is created explicitly and handed to each client at
/// construction. Clones share the same token, so rotating it through any
/// handle is seen by every client on the next request.
#[derive(Clone, Default)]
pub struct Session {
    token: Arc<RwLock<Option<String>>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Arc::new(RwLock::new(Some(token.into()))),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
        info!("Session token updated");
    }

    /// Drops the token, e.g. after the server rejected it
    pub async fn clear(&self) {
        if self.token.write().await.take().is_some() {
            debug!("Session token cleared");
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }
}
