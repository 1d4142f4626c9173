use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use crate::app::AppState;
use crate::database::models::{EntryId, JournalEntry};
use crate::database::Collection;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::helpers::today;
use crate::middleware::AuthSession;

/// Path token that resolves to the current reference-timezone date
const TODAY: &str = "today";

/// GET /journal/:id - Fetch one entry by id, or the caller's entries for `today`
pub async fn get(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Path(id): Path<String>,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let where_clause = if id == TODAY {
        let day = today(state.config.journal.reference_timezone());
        json!({ "user_id": session.user_id, "day": day })
    } else {
        json!({ "user_id": session.user_id, "id": EntryId::parse(&id).to_value() })
    };

    let filter = FilterData {
        select: Some(vec!["id".into(), "day".into(), "content".into(), "embedding".into()]),
        where_clause: Some(where_clause),
        ..Default::default()
    };

    let rows = match state.store.select(Collection::Journal, filter).await {
        Ok(rows) => rows,
        Err(e) if e.is_no_rows() => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    let entries = rows
        .into_iter()
        .map(JournalEntry::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(entries))
}
