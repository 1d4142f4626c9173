use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::SessionResolver;
use crate::config::{AppConfig, SecurityConfig};
use crate::database::DataStore;
use crate::embeddings::EmbeddingTrigger;
use crate::handlers::{journal, profile, system};

/// Dependencies shared by every handler. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DataStore>,
    pub sessions: Arc<dyn SessionResolver>,
    pub embeddings: Arc<dyn EmbeddingTrigger>,
}

pub fn router(state: AppState) -> Router {
    let mut app = Router::new()
        // Public
        .route("/", get(system::root))
        .route("/health", get(system::health))
        // Session required
        .merge(journal_routes())
        .merge(profile_routes())
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    if let Some(cors) = cors_layer(&state.config.security) {
        app = app.layer(cors);
    }

    app.with_state(state)
}

fn journal_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/journal",
            get(journal::journal_get)
                .post(journal::journal_post)
                .patch(journal::journal_patch),
        )
        .route("/journal/:id", get(journal::entry_get))
}

fn profile_routes() -> Router<AppState> {
    Router::new().route(
        "/userProfile/public",
        get(profile::public_get).put(profile::public_put),
    )
}

fn cors_layer(security: &SecurityConfig) -> Option<CorsLayer> {
    if !security.enable_cors {
        return None;
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_disabled_yields_no_layer() {
        let security = SecurityConfig {
            enable_cors: false,
            cors_origins: vec!["http://localhost:3000".to_string()],
        };
        assert!(cors_layer(&security).is_none());
    }

    #[test]
    fn cors_enabled_skips_invalid_origins() {
        let security = SecurityConfig {
            enable_cors: true,
            cors_origins: vec!["http://localhost:3000".to_string(), "bad\norigin".to_string()],
        };
        assert!(cors_layer(&security).is_some());
    }
}
