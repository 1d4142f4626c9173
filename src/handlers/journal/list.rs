use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::app::AppState;
use crate::database::models::JournalEntry;
use crate::database::{Collection, Page};
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::helpers::{parse_day, parse_param, Range};
use crate::middleware::AuthSession;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Kept as text so bad input yields a 400 rather than an extractor rejection
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub day: Option<String>,
    /// Case-insensitive substring match on content
    pub q: Option<String>,
}

/// GET /journal - Page through the caller's entries, newest day first
pub async fn list(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let journal = &state.config.journal;
    let offset = parse_param("offset", query.offset.as_deref(), 0)?;
    let limit = parse_param("limit", query.limit.as_deref(), journal.default_limit)?;
    let range = Range::from_offset_limit(offset, limit, journal.max_limit)?;

    let mut conditions = Map::new();
    conditions.insert("user_id".to_string(), json!(session.user_id));
    if let Some(q) = query.q.as_deref() {
        conditions.insert("content".to_string(), json!({ "$ilike": format!("%{}%", escape_like(q)) }));
    }
    if let Some(day) = query.day.as_deref().filter(|d| !d.trim().is_empty()) {
        conditions.insert("day".to_string(), json!(parse_day(day)?));
    }

    let filter = FilterData {
        select: Some(vec!["content".into(), "day".into(), "id".into()]),
        where_clause: Some(Value::Object(conditions)),
        order: Some(json!("day desc")),
        limit: Some(range.len()),
        offset: Some(range.from),
    };

    tracing::debug!("Listing journal for {} rows {}..={}", session.user_id, range.from, range.to);

    let page = match state.store.select_page(Collection::Journal, filter).await {
        Ok(page) => page,
        Err(e) if e.is_no_rows() => Page::default(),
        Err(e) => return Err(e.into()),
    };

    let data = page
        .rows
        .into_iter()
        .map(JournalEntry::from_row)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(json!({ "data": data, "count": page.count })))
}

/// Escape LIKE metacharacters so `q` matches literally.
fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("50% off_now"), "50\\% off\\_now");
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
