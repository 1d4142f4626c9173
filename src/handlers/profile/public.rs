use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::ProfileUpdate;
use crate::database::Collection;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::{ApiResponse, ApiResult, AuthSession};

/// GET /userProfile/public - The caller's profile row, or `data: null` when none exists
pub async fn get(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
) -> Result<Json<Value>, ApiError> {
    let filter = FilterData::matching(json!({ "id": session.user_id }));

    let data = match state.store.select_single(Collection::Profiles, filter).await {
        Ok(row) => Value::Object(row),
        Err(e) if e.is_no_rows() => Value::Null,
        Err(e) => return Err(e.into()),
    };

    Ok(Json(json!({ "data": data, "success": true })))
}

/// PUT /userProfile/public - Upsert the caller's profile; an empty object deletes it
pub async fn put(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<()> {
    let Json(body) = payload?;
    let Value::Object(fields) = body else {
        return Err(ApiError::bad_request("Profile update must be a JSON object"));
    };

    let update = ProfileUpdate::new(fields);
    if update.is_empty() {
        let deleted = state
            .store
            .delete(Collection::Profiles, json!({ "id": session.user_id }))
            .await?;
        tracing::info!("Deleted profile for {} ({} rows)", session.user_id, deleted);
        return Ok(ApiResponse::ok());
    }

    tracing::debug!("Upserting profile for {} with {} fields", session.user_id, update.fields().len());
    state
        .store
        .upsert(Collection::Profiles, update.into_row(session.user_id), "id")
        .await?;

    Ok(ApiResponse::ok())
}
