use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::auth::Session;
use crate::database::models::{EntryId, JournalEntry, JournalPatch, NewJournalEntry};
use crate::database::Collection;
use crate::error::ApiError;
use crate::helpers::{parse_day, today};
use crate::middleware::{ApiResponse, ApiResult, AuthSession};

/// Body accepted by both POST and PATCH /journal
#[derive(Debug, Default, Deserialize)]
pub struct SaveEntry {
    #[serde(default)]
    pub id: Option<EntryId>,
    #[serde(default)]
    pub day: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub embedding: Option<Value>,
}

impl SaveEntry {
    fn id(&self) -> Option<EntryId> {
        self.id.clone().filter(|id| !id.is_blank()).map(EntryId::normalized)
    }

    fn required_content(&self) -> Result<String, ApiError> {
        match self.content.as_deref() {
            Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
            _ => Err(ApiError::missing_field("content", "Missing content")),
        }
    }
}

/// POST /journal - Create an entry, or update it when the body carries an `id`
pub async fn create(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<SaveEntry>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(entry) = payload?;
    let content = entry.required_content()?;

    if let Some(id) = entry.id() {
        apply_update(&state, &session, id, content, entry.embedding).await?;
        return Ok(ApiResponse { data: None });
    }

    let day = match entry.day.as_deref().filter(|d| !d.trim().is_empty()) {
        Some(raw) => parse_day(raw)?,
        None => today(state.config.journal.reference_timezone()),
    };

    let row = NewJournalEntry { user_id: session.user_id, day, content }.into_row();
    let inserted = state.store.insert(Collection::Journal, row).await?;
    tracing::info!("Created journal entry for {} on {}", session.user_id, day);

    state.embeddings.trigger(&session);

    let data = inserted
        .into_iter()
        .map(JournalEntry::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ApiResponse::success(json!(data)))
}

/// PATCH /journal - Replace an entry's content (and embedding, when supplied)
pub async fn update(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<SaveEntry>, JsonRejection>,
) -> ApiResult<()> {
    let Json(entry) = payload?;
    let id = entry.id().ok_or_else(|| ApiError::missing_field("id", "Missing id"))?;
    let content = entry.required_content()?;

    apply_update(&state, &session, id, content, entry.embedding).await?;
    Ok(ApiResponse::ok())
}

async fn apply_update(
    state: &AppState,
    session: &Session,
    id: EntryId,
    content: String,
    embedding: Option<Value>,
) -> Result<(), ApiError> {
    let patch = JournalPatch { content, embedding }.into_row();
    let where_clause = json!({ "id": id.to_value(), "user_id": session.user_id });

    let updated = state.store.update(Collection::Journal, where_clause, patch).await?;
    if updated == 0 {
        tracing::debug!("Journal update for {} matched no entry with id {}", session.user_id, id);
    } else {
        tracing::info!("Updated journal entry {} for {}", id, session.user_id);
    }

    state.embeddings.trigger(session);
    Ok(())
}
