use std::sync::Arc;

use crate::auth::Session;
use crate::config::EmbeddingsConfig;

/// Post-save hook that asks the embeddings service to refresh the user's vectors.
///
/// `trigger` must return immediately. Implementations dispatch in the
/// background and never report the outcome to the caller.
pub trait EmbeddingTrigger: Send + Sync {
    fn trigger(&self, session: &Session);
}

/// POSTs to the embeddings endpoint on a spawned task, forwarding the caller's token.
pub struct HttpEmbeddingTrigger {
    client: reqwest::Client,
    url: String,
}

impl HttpEmbeddingTrigger {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

impl EmbeddingTrigger for HttpEmbeddingTrigger {
    fn trigger(&self, session: &Session) {
        let client = self.client.clone();
        let url = self.url.clone();
        let token = session.access_token.clone();
        let user_id = session.user_id;

        tokio::spawn(async move {
            match client.post(&url).bearer_auth(token).send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!("Embedding refresh accepted for user {}", user_id);
                }
                Ok(resp) => {
                    tracing::warn!("Embedding refresh for user {} returned {}", user_id, resp.status());
                }
                Err(e) => {
                    tracing::warn!("Embedding refresh for user {} failed: {}", user_id, e);
                }
            }
        });
    }
}

/// Used when no embeddings endpoint is configured.
pub struct NoopEmbeddingTrigger;

impl EmbeddingTrigger for NoopEmbeddingTrigger {
    fn trigger(&self, session: &Session) {
        tracing::debug!("Embeddings disabled; skipping refresh for user {}", session.user_id);
    }
}

pub fn from_config(config: &EmbeddingsConfig) -> Arc<dyn EmbeddingTrigger> {
    match config.url.as_deref() {
        Some(url) => {
            tracing::info!("Embedding refresh enabled: {}", url);
            Arc::new(HttpEmbeddingTrigger::new(url))
        }
        None => Arc::new(NoopEmbeddingTrigger),
    }
}
