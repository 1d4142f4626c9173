use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::app::AppState;
use crate::auth::Session;
use crate::error::ApiError;

/// Extractor for handlers that require a signed-in user.
///
/// Resolution failures of any kind reject with 403 before the handler (and
/// its body extractor) runs, so unauthenticated requests never reach the store.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

#[async_trait]
impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match state.sessions.resolve(&parts.headers).await {
            Ok(session) => {
                tracing::debug!("Session resolved for user {}", session.user_id);
                Ok(AuthSession(session))
            }
            Err(e) => {
                tracing::warn!("Rejecting {} {}: {}", parts.method, parts.uri.path(), e);
                Err(ApiError::forbidden("Unauthorized"))
            }
        }
    }
}
