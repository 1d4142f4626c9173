#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde_json::{json, Value};
use uuid::Uuid;

use journal_api::auth::{issue_token, Claims, JwtSessionResolver, Session};
use journal_api::config::AppConfig;
use journal_api::database::{Collection, MemoryStore, Row};
use journal_api::embeddings::EmbeddingTrigger;
use journal_api::helpers::today;
use journal_api::{router, AppState};

pub const TEST_SECRET: &str = "integration-test-secret";

/// Records which users had an embedding refresh dispatched.
#[derive(Default)]
pub struct RecordingEmbeddingTrigger {
    calls: Mutex<Vec<Uuid>>,
}

impl RecordingEmbeddingTrigger {
    pub fn count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    pub fn users(&self) -> Vec<Uuid> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl EmbeddingTrigger for RecordingEmbeddingTrigger {
    fn trigger(&self, session: &Session) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(session.user_id);
        }
    }
}

/// The router served in-process on a free port, backed by [`MemoryStore`].
pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub config: Arc<AppConfig>,
    pub store: Arc<MemoryStore>,
    pub embeddings: Arc<RecordingEmbeddingTrigger>,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        let mut config = AppConfig::development();
        config.auth.jwt_secret = TEST_SECRET.to_string();
        let config = Arc::new(config);

        let store = Arc::new(MemoryStore::new());
        let embeddings = Arc::new(RecordingEmbeddingTrigger::default());
        let sessions = JwtSessionResolver::from_config(&config.auth)?;

        let state = AppState {
            config: config.clone(),
            store: store.clone(),
            sessions: Arc::new(sessions),
            embeddings: embeddings.clone(),
        };

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .with_context(|| format!("failed to bind port {}", port))?;

        let app = router(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            client,
            config,
            store,
            embeddings,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token_for(&self, user_id: Uuid) -> Result<String> {
        let claims = Claims::new(user_id, Some(format!("{}@example.com", user_id)), chrono::Duration::hours(1));
        Ok(issue_token(&claims, TEST_SECRET)?)
    }

    /// Today in the configured reference timezone
    pub fn today(&self) -> NaiveDate {
        today(self.config.journal.reference_timezone())
    }

    pub async fn seed_entry(&self, user_id: Uuid, day: &str, content: &str) {
        self.store.seed(Collection::Journal, [entry_row(user_id, day, content)]).await;
    }
}

pub fn entry_row(user_id: Uuid, day: &str, content: &str) -> Row {
    let mut row = Row::new();
    row.insert("user_id".to_string(), json!(user_id));
    row.insert("day".to_string(), json!(day));
    row.insert("content".to_string(), json!(content));
    row
}

pub fn success(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool).unwrap_or(false)
}
